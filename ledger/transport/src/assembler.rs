//! Minimal TEAL assembler covering the opcodes Falcon control programs and
//! the filler program use. Output matches the node's assembler byte for byte
//! for that subset.

use anyhow::{anyhow, bail, Context};

/// Highest program version understood.
pub const MAX_VERSION: u64 = 12;

const TXN_FIELDS: &[(&str, u8)] = &[
    ("Sender", 0),
    ("Fee", 1),
    ("FirstValid", 2),
    ("LastValid", 4),
    ("Note", 5),
    ("Lease", 6),
    ("Receiver", 7),
    ("Amount", 8),
    ("CloseRemainderTo", 9),
    ("TypeEnum", 16),
    ("GroupIndex", 22),
    ("TxID", 23),
    ("RekeyTo", 32),
];

const GLOBAL_FIELDS: &[(&str, u8)] = &[
    ("MinTxnFee", 0),
    ("MinBalance", 1),
    ("MaxTxnLife", 2),
    ("ZeroAddress", 3),
    ("GroupSize", 4),
];

/// Opcodes without immediates: (mnemonic, byte, minimum version).
const SIMPLE_OPS: &[(&str, u8, u64)] = &[
    ("err", 0x00, 1),
    ("sha256", 0x01, 1),
    ("+", 0x08, 1),
    ("-", 0x09, 1),
    ("<", 0x0c, 1),
    (">", 0x0d, 1),
    ("&&", 0x10, 1),
    ("||", 0x11, 1),
    ("==", 0x12, 1),
    ("!=", 0x13, 1),
    ("!", 0x14, 1),
    ("len", 0x15, 1),
    ("pop", 0x48, 1),
    ("dup", 0x49, 1),
    ("falcon_verify", 0x85, 12),
];

/// Assemble `source` into bytecode.
pub fn assemble(source: &str) -> anyhow::Result<Vec<u8>> {
    let mut version = None;
    let mut out = Vec::new();

    for (index, raw) in source.lines().enumerate() {
        let line_no = index + 1;
        let line = strip_comment(raw);
        let mut words = line.split_whitespace();
        let Some(op) = words.next() else {
            continue;
        };
        let args: Vec<&str> = words.collect();

        if op == "#pragma" {
            if version.is_some() || !out.is_empty() {
                bail!("line {line_no}: #pragma version must come first");
            }
            let v = match args.as_slice() {
                ["version", v] => v
                    .parse::<u64>()
                    .with_context(|| format!("line {line_no}: bad version {v:?}"))?,
                _ => bail!("line {line_no}: expected #pragma version N"),
            };
            if v == 0 || v > MAX_VERSION {
                bail!("line {line_no}: unsupported version {v}");
            }
            write_varuint(&mut out, v);
            version = Some(v);
            continue;
        }

        let v = version.ok_or_else(|| anyhow!("line {line_no}: missing #pragma version"))?;
        assemble_op(&mut out, op, &args, v).with_context(|| format!("line {line_no}: {op}"))?;
    }

    if version.is_none() {
        bail!("empty program");
    }
    Ok(out)
}

fn assemble_op(out: &mut Vec<u8>, op: &str, args: &[&str], version: u64) -> anyhow::Result<()> {
    if let Some(&(_, byte, min)) = SIMPLE_OPS.iter().find(|(name, _, _)| *name == op) {
        expect_args(args, 0)?;
        require_version(version, min)?;
        out.push(byte);
        return Ok(());
    }
    match op {
        "bytecblock" => {
            let constants = args
                .iter()
                .map(|a| parse_bytes(a))
                .collect::<anyhow::Result<Vec<_>>>()?;
            out.push(0x26);
            write_varuint(out, constants.len() as u64);
            for c in constants {
                write_varuint(out, c.len() as u64);
                out.extend_from_slice(&c);
            }
        }
        "intcblock" => {
            let constants = args
                .iter()
                .map(|a| parse_uint(a))
                .collect::<anyhow::Result<Vec<_>>>()?;
            out.push(0x20);
            write_varuint(out, constants.len() as u64);
            for c in constants {
                write_varuint(out, c);
            }
        }
        "txn" => {
            expect_args(args, 1)?;
            out.extend_from_slice(&[0x31, field(TXN_FIELDS, args[0])?]);
        }
        "global" => {
            expect_args(args, 1)?;
            out.extend_from_slice(&[0x32, field(GLOBAL_FIELDS, args[0])?]);
        }
        "arg" => {
            expect_args(args, 1)?;
            let n = parse_uint(args[0])?;
            match n {
                0..=3 => out.push(0x2d + n as u8),
                4..=255 => out.extend_from_slice(&[0x2c, n as u8]),
                _ => bail!("arg index {n} out of range"),
            }
        }
        "pushbytes" => {
            expect_args(args, 1)?;
            require_version(version, 3)?;
            let bytes = parse_bytes(args[0])?;
            out.push(0x80);
            write_varuint(out, bytes.len() as u64);
            out.extend_from_slice(&bytes);
        }
        "pushint" => {
            expect_args(args, 1)?;
            require_version(version, 3)?;
            out.push(0x81);
            write_varuint(out, parse_uint(args[0])?);
        }
        _ => bail!("unknown opcode"),
    }
    Ok(())
}

fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(at) => &line[..at],
        None => line,
    }
}

fn expect_args(args: &[&str], n: usize) -> anyhow::Result<()> {
    if args.len() != n {
        bail!("expected {n} immediate(s), got {}", args.len());
    }
    Ok(())
}

fn require_version(version: u64, min: u64) -> anyhow::Result<()> {
    if version < min {
        bail!("needs program version {min}, have {version}");
    }
    Ok(())
}

fn field(table: &[(&str, u8)], name: &str) -> anyhow::Result<u8> {
    table
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, v)| *v)
        .ok_or_else(|| anyhow!("unknown field {name}"))
}

fn parse_bytes(arg: &str) -> anyhow::Result<Vec<u8>> {
    let digits = arg
        .strip_prefix("0x")
        .ok_or_else(|| anyhow!("byte constant {arg:?} must be 0x-prefixed hex"))?;
    hex::decode(digits).with_context(|| format!("bad hex constant {arg:?}"))
}

fn parse_uint(arg: &str) -> anyhow::Result<u64> {
    match arg.strip_prefix("0x") {
        Some(digits) => u64::from_str_radix(digits, 16),
        None => arg.parse(),
    }
    .with_context(|| format!("bad integer {arg:?}"))
}

fn write_varuint(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pqledger_core::{
        render_source, ControlProgram, FalconPublicKey, FALCON_PUBLIC_KEY_LEN, FILLER_PROGRAM,
        FILLER_SOURCE,
    };

    #[test]
    fn filler_source_assembles_to_pinned_bytes() {
        assert_eq!(assemble(FILLER_SOURCE).unwrap(), FILLER_PROGRAM.to_vec());
    }

    #[test]
    fn control_source_matches_template() {
        let key = FalconPublicKey::new([0x5a; FALCON_PUBLIC_KEY_LEN]);
        for counter in [0u8, 1, 0x7f, 0x80, 0xff] {
            let compiled = assemble(&render_source(&key, counter)).unwrap();
            let patched = ControlProgram::synthesize(&key, counter);
            assert_eq!(compiled, patched.as_bytes());
        }
    }

    #[test]
    fn varuint_lengths() {
        let mut out = Vec::new();
        write_varuint(&mut out, 1793);
        assert_eq!(out, vec![0x81, 0x0e]);
        out.clear();
        write_varuint(&mut out, 127);
        assert_eq!(out, vec![0x7f]);
    }

    #[test]
    fn rejects_bad_programs() {
        assert!(assemble("").is_err());
        assert!(assemble("txn Fee\n").is_err());
        assert!(assemble("#pragma version 13\n").is_err());
        assert!(assemble("#pragma version 11\nfalcon_verify\n").is_err());
        let err = assemble("#pragma version 12\nfrobnicate\n").unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
        assert!(assemble("#pragma version 12\ntxn Bogus\n").is_err());
        assert!(assemble("#pragma version 12\npushbytes 0xabc\n").is_err());
    }

    #[test]
    fn arg_forms() {
        let program = assemble("#pragma version 2\narg 0\narg 3\narg 4\n").unwrap();
        assert_eq!(program, vec![2, 0x2d, 0x30, 0x2c, 4]);
    }
}
