//! Location-expression disassembly.
//!
//! Formats the stack-machine bytecode stored in `DW_FORM_exprloc` attributes
//! as a space separated token sequence. Only the opcodes the viewer knows are
//! given names; everything else is shown as its raw hex byte so a block with
//! unfamiliar opcodes still renders.
//!
//! Every operand read is bounds-checked against the block. A truncated operand
//! produces a `<truncated>` token and ends the listing.

use gimli::{constants, EndianSlice, LittleEndian, Reader};

/// x86-64 DWARF register numbering: general purpose, return address, SSE,
/// x87 and MMX registers.
const X86_64_REGISTERS: [&str; 49] = [
    "rax", "rdx", "rcx", "rbx", "rsi", "rdi", "rbp", "rsp", "r8", "r9", "r10", "r11", "r12", "r13", "r14", "r15", "rip",
    "xmm0", "xmm1", "xmm2", "xmm3", "xmm4", "xmm5", "xmm6", "xmm7", "xmm8", "xmm9", "xmm10", "xmm11", "xmm12", "xmm13",
    "xmm14", "xmm15", "st0", "st1", "st2", "st3", "st4", "st5", "st6", "st7", "mm0", "mm1", "mm2", "mm3", "mm4", "mm5",
    "mm6", "mm7",
];

/// Name of a DWARF register number.
#[must_use]
pub fn register_name(number: u64) -> &'static str
{
    usize::try_from(number)
        .ok()
        .and_then(|index| X86_64_REGISTERS.get(index))
        .copied()
        .unwrap_or("unknown")
}

/// Decode a signed LEB128 value.
///
/// Returns the value and the number of bytes consumed, or `None` if the input
/// ends before a terminating byte or the encoding does not fit in 64 bits.
#[must_use]
pub fn read_sleb128(bytes: &[u8]) -> Option<(i64, usize)>
{
    let mut reader = EndianSlice::new(bytes, LittleEndian);
    let value = reader.read_sleb128().ok()?;
    Some((value, bytes.len() - reader.len()))
}

/// Read a little-endian address operand of `size` bytes (1, 2, 4 or 8).
fn read_address(bytes: &[u8], size: u8) -> Option<u64>
{
    EndianSlice::new(bytes, LittleEndian).read_address(size).ok()
}

/// Disassemble a location expression.
///
/// `address_size` is the width of `DW_OP_addr` operands for the image.
///
/// ```rust
/// use dwarview_core::decode::expr::disassemble;
///
/// // DW_OP_fbreg -20
/// assert_eq!(disassemble(&[0x91, 0x6c], 8), "(fbreg-20)");
/// ```
#[must_use]
pub fn disassemble(bytes: &[u8], address_size: u8) -> String
{
    let mut tokens = Vec::new();
    let mut cursor = 0;

    while let Some(&opcode) = bytes.get(cursor) {
        cursor += 1;
        let operand = &bytes[cursor..];

        match constants::DwOp(opcode) {
            op if (constants::DW_OP_lit0.0..=constants::DW_OP_lit31.0).contains(&op.0) => {
                tokens.push(format!("literal {}", op.0 - constants::DW_OP_lit0.0));
            }
            op if (constants::DW_OP_reg0.0..=constants::DW_OP_reg31.0).contains(&op.0) => {
                let number = op.0 - constants::DW_OP_reg0.0;
                tokens.push(format!("reg{number}: {}", register_name(number.into())));
            }
            op if (constants::DW_OP_breg0.0..=constants::DW_OP_breg31.0).contains(&op.0) => {
                let register = register_name((op.0 - constants::DW_OP_breg0.0).into());
                let Some((offset, length)) = read_sleb128(operand) else {
                    tokens.push(format!("{register}<truncated>"));
                    break;
                };
                tokens.push(format!("{register}{offset:+}"));
                cursor += length;
            }
            constants::DW_OP_addr => {
                let Some(address) = read_address(operand, address_size) else {
                    tokens.push("(addr <truncated>)".to_string());
                    break;
                };
                tokens.push(format!("(addr {address:#x})"));
                cursor += usize::from(address_size);
            }
            constants::DW_OP_fbreg => {
                let Some((offset, length)) = read_sleb128(operand) else {
                    tokens.push("(fbreg <truncated>)".to_string());
                    break;
                };
                tokens.push(format!("(fbreg{offset:+})"));
                cursor += length;
            }
            constants::DW_OP_deref => tokens.push("(deref)".to_string()),
            constants::DW_OP_nop => tokens.push("(nop)".to_string()),
            constants::DW_OP_call_frame_cfa => tokens.push("(cfa)".to_string()),
            other => tokens.push(format!("{:02x}", other.0)),
        }
    }

    tokens.join(" ")
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn encode_sleb128(mut value: i64) -> Vec<u8>
    {
        let mut out = Vec::new();
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            let done = (value == 0 && byte & 0x40 == 0) || (value == -1 && byte & 0x40 != 0);
            if done {
                out.push(byte);
                return out;
            }
            out.push(byte | 0x80);
        }
    }

    #[test]
    fn test_sleb128_known_encodings()
    {
        assert_eq!(read_sleb128(&[0x00]), Some((0, 1)));
        assert_eq!(read_sleb128(&[0x7f]), Some((-1, 1)));
        assert_eq!(read_sleb128(&[0x02]), Some((2, 1)));
        assert_eq!(read_sleb128(&[0xff, 0x00]), Some((127, 2)));
        assert_eq!(read_sleb128(&[0x80, 0x7f]), Some((-128, 2)));
        assert_eq!(read_sleb128(&[0x6c, 0xff]), Some((-20, 1)));
    }

    #[test]
    fn test_sleb128_truncated()
    {
        assert_eq!(read_sleb128(&[]), None);
        assert_eq!(read_sleb128(&[0x80]), None);
        assert_eq!(read_sleb128(&[0xff, 0xff]), None);
        // eleven bytes cannot hold a 64-bit value
        assert_eq!(read_sleb128(&[0xff; 10].iter().copied().chain([0x01]).collect::<Vec<_>>()), None);
    }

    #[test]
    fn test_sleb128_round_trip_is_canonical()
    {
        for value in [0, 1, -1, 63, 64, -64, -65, 127, 128, -129, 8191, -8193, i64::from(i32::MAX), i64::MIN, i64::MAX] {
            let encoded = encode_sleb128(value);
            assert_eq!(read_sleb128(&encoded), Some((value, encoded.len())), "value {value}");
        }
        assert_eq!(encode_sleb128(-1).len(), 1);
        assert_eq!(encode_sleb128(63).len(), 1);
        assert_eq!(encode_sleb128(64).len(), 2);
    }

    #[test]
    fn test_read_address_bounds()
    {
        assert_eq!(read_address(&[0x10, 0x20], 2), Some(0x2010));
        assert_eq!(read_address(&[0x10], 2), None);
        assert_eq!(read_address(&[0x10], 0), None);
        assert_eq!(read_address(&[0x10, 0x20, 0x30], 3), None);
        assert_eq!(read_address(&[0x78, 0x56, 0x34, 0x12, 0xff], 4), Some(0x1234_5678));
    }

    #[test]
    fn test_register_name_fallback()
    {
        assert_eq!(register_name(6), "rbp");
        assert_eq!(register_name(48), "mm7");
        assert_eq!(register_name(49), "unknown");
    }
}
