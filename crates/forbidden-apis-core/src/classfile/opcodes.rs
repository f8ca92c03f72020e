//! JVM opcode constants and instruction lengths.

use super::reader::i4_at;
use super::ClassParseError;

pub(crate) const LDC: u8 = 0x12;
pub(crate) const LDC_W: u8 = 0x13;
pub(crate) const TABLESWITCH: u8 = 0xaa;
pub(crate) const LOOKUPSWITCH: u8 = 0xab;
pub(crate) const GETSTATIC: u8 = 0xb2;
pub(crate) const PUTSTATIC: u8 = 0xb3;
pub(crate) const GETFIELD: u8 = 0xb4;
pub(crate) const PUTFIELD: u8 = 0xb5;
pub(crate) const INVOKEVIRTUAL: u8 = 0xb6;
pub(crate) const INVOKESPECIAL: u8 = 0xb7;
pub(crate) const INVOKESTATIC: u8 = 0xb8;
pub(crate) const INVOKEINTERFACE: u8 = 0xb9;
pub(crate) const INVOKEDYNAMIC: u8 = 0xba;
pub(crate) const NEW: u8 = 0xbb;
pub(crate) const ANEWARRAY: u8 = 0xbd;
pub(crate) const CHECKCAST: u8 = 0xc0;
pub(crate) const INSTANCEOF: u8 = 0xc1;
pub(crate) const WIDE: u8 = 0xc4;
pub(crate) const MULTIANEWARRAY: u8 = 0xc5;

const IINC: u8 = 0x84;

/// Total length in bytes of the instruction starting at `pc`.
pub(crate) fn instruction_length(code: &[u8], pc: usize) -> Result<usize, ClassParseError> {
    let opcode = *code.get(pc).ok_or(ClassParseError::TruncatedCode { offset: pc })?;
    let len = match opcode {
        0x00..=0x0f | 0x1a..=0x35 | 0x3b..=0x83 | 0x85..=0x98 | 0xac..=0xb1 | 0xbe | 0xbf
        | 0xc2 | 0xc3 | 0xca | 0xfe | 0xff => 1,
        0x10 | LDC | 0x15..=0x19 | 0x36..=0x3a | 0xa9 | 0xbc => 2,
        0x11 | LDC_W | 0x14 | IINC | 0x99..=0xa8 | 0xb2..=0xb8 | NEW | ANEWARRAY | CHECKCAST
        | INSTANCEOF | 0xc6 | 0xc7 => 3,
        MULTIANEWARRAY => 4,
        INVOKEINTERFACE | INVOKEDYNAMIC | 0xc8 | 0xc9 => 5,
        WIDE => {
            let modified = *code
                .get(pc + 1)
                .ok_or(ClassParseError::TruncatedCode { offset: pc + 1 })?;
            if modified == IINC {
                6
            } else {
                4
            }
        }
        TABLESWITCH => {
            let base = pc + 1 + switch_padding(pc);
            let low = i4_at(code, base + 4)?;
            let high = i4_at(code, base + 8)?;
            let count = i64::from(high) - i64::from(low) + 1;
            let entries = usize::try_from(count)
                .map_err(|_| ClassParseError::InvalidSwitch { offset: pc })?;
            1 + switch_padding(pc) + 12 + entries * 4
        }
        LOOKUPSWITCH => {
            let base = pc + 1 + switch_padding(pc);
            let pairs = usize::try_from(i4_at(code, base + 4)?)
                .map_err(|_| ClassParseError::InvalidSwitch { offset: pc })?;
            1 + switch_padding(pc) + 8 + pairs * 8
        }
        other => {
            return Err(ClassParseError::InvalidOpcode {
                opcode: other,
                offset: pc,
            })
        }
    };
    if pc + len > code.len() {
        return Err(ClassParseError::TruncatedCode { offset: pc });
    }
    Ok(len)
}

/// Switch operands are aligned to a 4-byte boundary from the start of code.
fn switch_padding(pc: usize) -> usize {
    (4 - ((pc + 1) % 4)) % 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_lengths() {
        assert_eq!(instruction_length(&[0x00], 0).unwrap(), 1); // nop
        assert_eq!(instruction_length(&[0x10, 5], 0).unwrap(), 2); // bipush
        assert_eq!(instruction_length(&[0x11, 0, 5], 0).unwrap(), 3); // sipush
        assert_eq!(instruction_length(&[INVOKESTATIC, 0, 1], 0).unwrap(), 3);
        assert_eq!(
            instruction_length(&[INVOKEINTERFACE, 0, 1, 1, 0], 0).unwrap(),
            5
        );
        assert_eq!(instruction_length(&[MULTIANEWARRAY, 0, 1, 2], 0).unwrap(), 4);
        assert_eq!(instruction_length(&[0xc8, 0, 0, 0, 0], 0).unwrap(), 5); // goto_w
    }

    #[test]
    fn wide_lengths() {
        assert_eq!(instruction_length(&[WIDE, 0x15, 0, 1], 0).unwrap(), 4);
        assert_eq!(instruction_length(&[WIDE, IINC, 0, 1, 0, 1], 0).unwrap(), 6);
    }

    #[test]
    fn tableswitch_with_padding() {
        // pc = 1 -> padding 2
        let mut code = vec![0x00, TABLESWITCH, 0, 0];
        code.extend_from_slice(&0i32.to_be_bytes()); // default
        code.extend_from_slice(&1i32.to_be_bytes()); // low
        code.extend_from_slice(&3i32.to_be_bytes()); // high
        code.extend_from_slice(&[0u8; 12]); // 3 offsets
        assert_eq!(instruction_length(&code, 1).unwrap(), 1 + 2 + 12 + 12);
    }

    #[test]
    fn lookupswitch_without_padding() {
        // pc = 3 -> padding 0
        let mut code = vec![0x00, 0x00, 0x00, LOOKUPSWITCH];
        code.extend_from_slice(&0i32.to_be_bytes()); // default
        code.extend_from_slice(&2i32.to_be_bytes()); // npairs
        code.extend_from_slice(&[0u8; 16]);
        assert_eq!(instruction_length(&code, 3).unwrap(), 1 + 8 + 16);
    }

    #[test]
    fn negative_switch_counts_are_rejected() {
        let mut code = vec![LOOKUPSWITCH, 0, 0, 0];
        code.extend_from_slice(&0i32.to_be_bytes());
        code.extend_from_slice(&(-1i32).to_be_bytes());
        assert!(matches!(
            instruction_length(&code, 0),
            Err(ClassParseError::InvalidSwitch { offset: 0 })
        ));
    }

    #[test]
    fn truncated_and_unknown_opcodes() {
        assert!(matches!(
            instruction_length(&[INVOKESTATIC, 0], 0),
            Err(ClassParseError::TruncatedCode { .. })
        ));
        assert!(matches!(
            instruction_length(&[0xcb], 0),
            Err(ClassParseError::InvalidOpcode { opcode: 0xcb, .. })
        ));
    }
}
