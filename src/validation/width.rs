use crate::ast::{BinaryOp, Expression, UnaryOp};
use crate::directive::CommandExtension;
use crate::opcode::AddressWidth;
use crate::program::Program;

/// Constant labels referring to each other are followed no deeper than this.
const MAX_DEPTH: usize = 32;

/// Value of an expression built from literals and constant labels.
///
/// Operators fold left to right as written. `None` means the value is unknown: an undefined or
/// non-constant label, the program counter, a string, an overflow or a division by zero.
pub fn evaluate(expression: &Expression, program: &Program) -> Option<i64> {
    evaluate_at(expression, program, 0)
}

fn evaluate_at(expression: &Expression, program: &Program, depth: usize) -> Option<i64> {
    if depth > MAX_DEPTH {
        tracing::debug!(location = %expression.location(), "constant nesting too deep");
        return None;
    }

    match expression {
        Expression::NumberLiteral(literal) => literal.value,
        Expression::CharLiteral(literal) => Some(literal.value as i64),
        Expression::Identifier(identifier) if identifier.program_counter => None,
        Expression::Identifier(identifier) => {
            let label = program.label_for_usage(&identifier.location)?;
            if !label.defined_as_constant || label.defined_as_variable {
                return None;
            }
            evaluate_at(label.value.as_ref()?, program, depth + 1)
        }
        Expression::Brackets(brackets) => evaluate_at(&brackets.inner, program, depth),
        Expression::Unary(unary) => {
            let value = evaluate_at(&unary.operand, program, depth)?;
            match unary.operator {
                UnaryOp::Negate => value.checked_neg(),
                UnaryOp::BitNot => Some(!value),
                UnaryOp::Not => Some((value == 0) as i64),
                UnaryOp::LowByte => Some(value & 0xFF),
                UnaryOp::HighByte => Some((value >> 8) & 0xFF),
            }
        }
        Expression::Binary(binary) => {
            let left = evaluate_at(&binary.left, program, depth)?;
            let right = evaluate_at(&binary.right, program, depth)?;
            apply(binary.operator, left, right)
        }
        Expression::DynamicLabel(_)
        | Expression::StringLiteral(_)
        | Expression::MacroArgument(_) => None,
    }
}

fn apply(operator: BinaryOp, left: i64, right: i64) -> Option<i64> {
    let shift = || u32::try_from(right).ok();
    match operator {
        BinaryOp::Add => left.checked_add(right),
        BinaryOp::Subtract => left.checked_sub(right),
        BinaryOp::Multiply => left.checked_mul(right),
        BinaryOp::Divide => left.checked_div(right),
        BinaryOp::Modulo => left.checked_rem(right),
        BinaryOp::BitAnd => Some(left & right),
        BinaryOp::BitOr => Some(left | right),
        BinaryOp::Xor => Some(left ^ right),
        BinaryOp::And => Some((left != 0 && right != 0) as i64),
        BinaryOp::Or => Some((left != 0 || right != 0) as i64),
        BinaryOp::Equal => Some((left == right) as i64),
        BinaryOp::NotEqual => Some((left != right) as i64),
        BinaryOp::Less => Some((left < right) as i64),
        BinaryOp::LessEqual => Some((left <= right) as i64),
        BinaryOp::Greater => Some((left > right) as i64),
        BinaryOp::GreaterEqual => Some((left >= right) as i64),
        BinaryOp::ShiftLeft => left.checked_shl(shift()?),
        BinaryOp::ShiftRight => left.checked_shr(shift()?),
    }
}

/// Width an address operand is encoded with.
///
/// A width extension on the command wins. Otherwise values up to `$FF` are zero page, and
/// everything else, unknown values included, is absolute.
pub fn address_width(
    extension: Option<CommandExtension>,
    value: &Expression,
    program: &Program,
) -> AddressWidth {
    if let Some(width) = extension.and_then(|extension| extension.width()) {
        return width;
    }
    evaluate(value, program).map_or(AddressWidth::Absolute, AddressWidth::for_value)
}
