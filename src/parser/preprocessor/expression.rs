//! `#if` expression evaluation.
//!
//! Operates on macro-expanded tokens. Identifiers left after expansion
//! evaluate to 0 (`true` to 1). Arithmetic wraps.

use super::PpToken;
use crate::parser::syntax_kind::SyntaxKind;

/// Evaluate a preprocessed constant expression.
pub fn evaluate(tokens: &[PpToken]) -> Result<i64, String> {
    let mut parser = ExprParser { tokens, pos: 0 };
    let value = parser.conditional()?;
    match parser.peek() {
        None => Ok(value),
        Some(tok) => Err(format!("token \"{}\" is not valid in preprocessor expressions", tok.text)),
    }
}

struct ExprParser<'a> {
    tokens: &'a [PpToken],
    pos: usize,
}

#[derive(Clone, Copy)]
enum BinOp {
    Or,
    And,
    BitOr,
    BitXor,
    BitAnd,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinOp {
    fn from_kind(kind: SyntaxKind) -> Option<(BinOp, u8)> {
        let op = match kind {
            SyntaxKind::PIPE_PIPE => (BinOp::Or, 1),
            SyntaxKind::AMP_AMP => (BinOp::And, 2),
            SyntaxKind::PIPE => (BinOp::BitOr, 3),
            SyntaxKind::CARET => (BinOp::BitXor, 4),
            SyntaxKind::AMP => (BinOp::BitAnd, 5),
            SyntaxKind::EQ_EQ => (BinOp::Eq, 6),
            SyntaxKind::BANG_EQ => (BinOp::Ne, 6),
            SyntaxKind::LT => (BinOp::Lt, 7),
            SyntaxKind::GT => (BinOp::Gt, 7),
            SyntaxKind::LT_EQ => (BinOp::Le, 7),
            SyntaxKind::GT_EQ => (BinOp::Ge, 7),
            SyntaxKind::SHL => (BinOp::Shl, 8),
            SyntaxKind::SHR => (BinOp::Shr, 8),
            SyntaxKind::PLUS => (BinOp::Add, 9),
            SyntaxKind::MINUS => (BinOp::Sub, 9),
            SyntaxKind::STAR => (BinOp::Mul, 10),
            SyntaxKind::SLASH => (BinOp::Div, 10),
            SyntaxKind::PERCENT => (BinOp::Rem, 10),
            _ => return None,
        };
        Some(op)
    }

    fn apply(self, lhs: i64, rhs: i64) -> Result<i64, String> {
        let value = match self {
            BinOp::Or => i64::from(lhs != 0 || rhs != 0),
            BinOp::And => i64::from(lhs != 0 && rhs != 0),
            BinOp::BitOr => lhs | rhs,
            BinOp::BitXor => lhs ^ rhs,
            BinOp::BitAnd => lhs & rhs,
            BinOp::Eq => i64::from(lhs == rhs),
            BinOp::Ne => i64::from(lhs != rhs),
            BinOp::Lt => i64::from(lhs < rhs),
            BinOp::Gt => i64::from(lhs > rhs),
            BinOp::Le => i64::from(lhs <= rhs),
            BinOp::Ge => i64::from(lhs >= rhs),
            BinOp::Shl => lhs.wrapping_shl(rhs as u32),
            BinOp::Shr => lhs.wrapping_shr(rhs as u32),
            BinOp::Add => lhs.wrapping_add(rhs),
            BinOp::Sub => lhs.wrapping_sub(rhs),
            BinOp::Mul => lhs.wrapping_mul(rhs),
            BinOp::Div | BinOp::Rem if rhs == 0 => {
                return Err("division by zero in preprocessor expression".to_string());
            }
            BinOp::Div => lhs.wrapping_div(rhs),
            BinOp::Rem => lhs.wrapping_rem(rhs),
        };
        Ok(value)
    }
}

impl<'a> ExprParser<'a> {
    fn peek(&self) -> Option<&'a PpToken> {
        self.tokens.get(self.pos)
    }

    fn at(&self, kind: SyntaxKind) -> bool {
        self.peek().is_some_and(|t| t.kind == kind)
    }

    fn bump(&mut self) -> Option<&'a PpToken> {
        let tok = self.tokens.get(self.pos);
        self.pos += 1;
        tok
    }

    fn expect(&mut self, kind: SyntaxKind, what: &str) -> Result<(), String> {
        if self.at(kind) {
            self.pos += 1;
            Ok(())
        } else {
            Err(format!("expected '{what}' in preprocessor expression"))
        }
    }

    fn conditional(&mut self) -> Result<i64, String> {
        let cond = self.binary(1)?;
        if !self.at(SyntaxKind::QUESTION) {
            return Ok(cond);
        }
        self.pos += 1;
        let then = self.conditional()?;
        self.expect(SyntaxKind::COLON, ":")?;
        let otherwise = self.conditional()?;
        Ok(if cond != 0 { then } else { otherwise })
    }

    fn binary(&mut self, min_prec: u8) -> Result<i64, String> {
        let mut lhs = self.unary()?;
        while let Some((op, prec)) = self.peek().and_then(|t| BinOp::from_kind(t.kind)) {
            if prec < min_prec {
                break;
            }
            self.pos += 1;
            let rhs = self.binary(prec + 1)?;
            lhs = op.apply(lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<i64, String> {
        let Some(tok) = self.bump() else {
            return Err("unexpected end of preprocessor expression".to_string());
        };
        match tok.kind {
            SyntaxKind::BANG => Ok(i64::from(self.unary()? == 0)),
            SyntaxKind::TILDE => Ok(!self.unary()?),
            SyntaxKind::MINUS => Ok(self.unary()?.wrapping_neg()),
            SyntaxKind::PLUS => self.unary(),
            SyntaxKind::L_PAREN => {
                let value = self.conditional()?;
                self.expect(SyntaxKind::R_PAREN, ")")?;
                Ok(value)
            }
            SyntaxKind::NUMBER => parse_number(&tok.text),
            SyntaxKind::CHAR => Ok(parse_char(&tok.text)),
            SyntaxKind::IDENT => Ok(i64::from(tok.text == "true")),
            _ => Err(format!(
                "token \"{}\" is not valid in preprocessor expressions",
                tok.text
            )),
        }
    }
}

fn parse_number(text: &str) -> Result<i64, String> {
    let digits: String = text.chars().filter(|&c| c != '\'').collect();
    let trimmed = digits.trim_end_matches(['u', 'U', 'l', 'L']);
    let (radix, body) = if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        (16, hex)
    } else if let Some(bin) = trimmed
        .strip_prefix("0b")
        .or_else(|| trimmed.strip_prefix("0B"))
    {
        (2, bin)
    } else if trimmed.len() > 1 && trimmed.starts_with('0') {
        (8, &trimmed[1..])
    } else {
        (10, trimmed)
    };
    u64::from_str_radix(body, radix)
        .map(|v| v as i64)
        .map_err(|_| format!("invalid integer constant '{text}' in preprocessor expression"))
}

fn parse_char(text: &str) -> i64 {
    let inner = text
        .trim_start_matches(['L', 'u', 'U', '8'])
        .trim_matches('\'');
    let mut chars = inner.chars();
    match (chars.next(), chars.next()) {
        (Some('\\'), Some(escaped)) => match escaped {
            'n' => 10,
            't' => 9,
            'r' => 13,
            '0' => 0,
            'a' => 7,
            'b' => 8,
            'f' => 12,
            'v' => 11,
            other => other as i64,
        },
        (Some(c), _) => c as i64,
        _ => 0,
    }
}
