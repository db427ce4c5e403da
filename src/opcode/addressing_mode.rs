use strum_macros::Display;

/// Addressing mode of an instruction.
///
/// This represents the way the instruction uses the operand.
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy, Display)]
pub enum AddressingMode {
    /// `a`
    Absolute,
    /// `zp`
    ZeroPage,
    /// `zp,x`
    ZeroPageX,
    /// `zp,y`
    ZeroPageY,
    /// `a,x`
    AbsoluteX,
    /// `a,y`
    AbsoluteY,
    /// `r` for branch instructions
    Relative,
    /// `(a)`
    Indirect,
    /// `(zp,x)`
    IndirectIndexedX,
    /// `(zp),y`
    IndirectIndexedY,

    /// `#v`
    Immediate,

    Accumulator,
    Implied,
}

impl AddressingMode {
    /// Size in bytes of an instruction using this mode, opcode included.
    pub fn length(&self) -> u8 {
        match self {
            AddressingMode::Accumulator | AddressingMode::Implied => 1,
            AddressingMode::Immediate
            | AddressingMode::ZeroPage
            | AddressingMode::ZeroPageX
            | AddressingMode::ZeroPageY
            | AddressingMode::Relative
            | AddressingMode::IndirectIndexedX
            | AddressingMode::IndirectIndexedY => 2,
            AddressingMode::Absolute
            | AddressingMode::AbsoluteX
            | AddressingMode::AbsoluteY
            | AddressingMode::Indirect => 3,
        }
    }

    pub fn is_implied_like(&self) -> bool {
        matches!(self, AddressingMode::Implied | AddressingMode::Accumulator)
    }
}

/// The two widths an address operand can be encoded with.
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy, Display)]
pub enum AddressWidth {
    ZeroPage,
    Absolute,
}

impl AddressWidth {
    /// Width needed for a known operand value. Anything outside `0..=$FF` is absolute.
    pub fn for_value(value: i64) -> AddressWidth {
        if (0..=0xFF).contains(&value) {
            AddressWidth::ZeroPage
        } else {
            AddressWidth::Absolute
        }
    }
}

/// Index register following an address operand.
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy)]
pub enum Index {
    None,
    X,
    Y,
}

impl AddressingMode {
    /// Concrete mode of a plain or indexed address operand of the given width.
    pub fn address(index: Index, width: AddressWidth) -> AddressingMode {
        match (index, width) {
            (Index::None, AddressWidth::ZeroPage) => AddressingMode::ZeroPage,
            (Index::None, AddressWidth::Absolute) => AddressingMode::Absolute,
            (Index::X, AddressWidth::ZeroPage) => AddressingMode::ZeroPageX,
            (Index::X, AddressWidth::Absolute) => AddressingMode::AbsoluteX,
            (Index::Y, AddressWidth::ZeroPage) => AddressingMode::ZeroPageY,
            (Index::Y, AddressWidth::Absolute) => AddressingMode::AbsoluteY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_boundary() {
        let tests = vec![
            (0, AddressWidth::ZeroPage),
            (0xFF, AddressWidth::ZeroPage),
            (0x100, AddressWidth::Absolute),
            (0xFFFF, AddressWidth::Absolute),
            (-1, AddressWidth::Absolute),
        ];
        for (input, expected) in tests {
            assert_eq!(AddressWidth::for_value(input), expected, "{}", input);
        }
    }

    #[test]
    fn test_address_modes() {
        assert_eq!(
            AddressingMode::address(Index::X, AddressWidth::ZeroPage),
            AddressingMode::ZeroPageX
        );
        assert_eq!(
            AddressingMode::address(Index::Y, AddressWidth::Absolute),
            AddressingMode::AbsoluteY
        );
        assert_eq!(AddressingMode::Indirect.length(), 3);
        assert_eq!(AddressingMode::Relative.length(), 2);
    }
}
