//! Logos-based lexer for C-family source
//!
//! Fast tokenization using the logos crate. Trivia other than newlines is
//! dropped; newlines are kept because preprocessor directives are line based.

use super::syntax_kind::SyntaxKind;
use logos::Logos;
use text_size::{TextRange, TextSize};

/// A token with its kind, text, and position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: SyntaxKind,
    pub text: &'a str,
    pub range: TextRange,
    /// 0-based line of the first character
    pub line: u32,
    /// 0-based byte column of the first character
    pub column: u32,
}

/// Lexer wrapping the logos-generated tokenizer
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, LogosToken>,
    line: u32,
    line_start: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            inner: LogosToken::lexer(input),
            line: 0,
            line_start: 0,
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let logos_token = self.inner.next()?;
            let text = self.inner.slice();
            let span = self.inner.span();
            let line = self.line;
            let column = (span.start - self.line_start) as u32;

            // Advance line bookkeeping past any newline inside the token.
            if let Some(last_nl) = text.rfind('\n') {
                self.line += text.matches('\n').count() as u32;
                self.line_start = span.start + last_nl + 1;
            }

            let kind = match logos_token {
                Ok(t) => t.into(),
                Err(()) => SyntaxKind::ERROR,
            };
            if kind.is_trivia() {
                continue;
            }

            let range = TextRange::new(
                TextSize::new(span.start as u32),
                TextSize::new(span.end as u32),
            );
            return Some(Token {
                kind,
                text,
                range,
                line,
                column,
            });
        }
    }
}

/// Tokenize an entire string into a Vec
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    Lexer::new(input).collect()
}

/// Logos token enum - maps to SyntaxKind
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
pub enum LogosToken {
    // =========================================================================
    // TRIVIA
    // =========================================================================
    #[regex(r"[ \t\x0B\x0C]+")]
    Whitespace,

    #[regex(r"\r?\n")]
    Newline,

    #[regex(r"\\\r?\n")]
    LineContinuation,

    #[regex(r"//[^\n]*")]
    LineComment,

    #[regex(r"/\*([^*]|\*+[^*/])*\*+/")]
    BlockComment,

    // =========================================================================
    // LITERALS
    // =========================================================================
    #[regex(r"[a-zA-Z_$][a-zA-Z0-9_$]*")]
    Ident,

    #[regex(r"[0-9]([0-9a-zA-Z_.']|[eEpP][+-])*")]
    #[regex(r"\.[0-9]([0-9a-zA-Z_.']|[eEpP][+-])*")]
    Number,

    #[regex(r#"(L|u8|u|U)?"([^"\\\n]|\\.)*""#)]
    String,

    #[regex(r"(L|u8|u|U)?'([^'\\\n]|\\.)*'")]
    Char,

    // =========================================================================
    // MULTI-CHARACTER PUNCTUATION (must come before single-char)
    // =========================================================================
    #[token("::")]
    ColonColon,
    #[token("...")]
    Ellipsis,
    #[token(".*")]
    DotStar,
    #[token("->*")]
    ArrowStar,
    #[token("->")]
    Arrow,
    #[token("##")]
    HashHash,
    #[token("==")]
    EqEq,
    #[token("!=")]
    BangEq,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
    #[token("+=")]
    #[token("-=")]
    #[token("*=")]
    #[token("/=")]
    #[token("%=")]
    #[token("&=")]
    #[token("|=")]
    #[token("^=")]
    #[token("<<=")]
    #[token(">>=")]
    AssignOp,

    // =========================================================================
    // SINGLE-CHARACTER PUNCTUATION
    // =========================================================================
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("#")]
    Hash,
    #[token("?")]
    Question,
    #[token("=")]
    Eq,
    #[token("!")]
    Bang,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("^")]
    Caret,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("~")]
    Tilde,
}

impl From<LogosToken> for SyntaxKind {
    fn from(token: LogosToken) -> Self {
        match token {
            LogosToken::Whitespace => SyntaxKind::WHITESPACE,
            LogosToken::Newline => SyntaxKind::NEWLINE,
            LogosToken::LineContinuation => SyntaxKind::LINE_CONTINUATION,
            LogosToken::LineComment => SyntaxKind::LINE_COMMENT,
            LogosToken::BlockComment => SyntaxKind::BLOCK_COMMENT,
            LogosToken::Ident => SyntaxKind::IDENT,
            LogosToken::Number => SyntaxKind::NUMBER,
            LogosToken::String => SyntaxKind::STRING,
            LogosToken::Char => SyntaxKind::CHAR,
            LogosToken::ColonColon => SyntaxKind::COLON_COLON,
            LogosToken::Ellipsis => SyntaxKind::ELLIPSIS,
            LogosToken::DotStar => SyntaxKind::DOT_STAR,
            LogosToken::ArrowStar => SyntaxKind::ARROW_STAR,
            LogosToken::Arrow => SyntaxKind::ARROW,
            LogosToken::HashHash => SyntaxKind::HASH_HASH,
            LogosToken::EqEq => SyntaxKind::EQ_EQ,
            LogosToken::BangEq => SyntaxKind::BANG_EQ,
            LogosToken::LtEq => SyntaxKind::LT_EQ,
            LogosToken::GtEq => SyntaxKind::GT_EQ,
            LogosToken::Shl => SyntaxKind::SHL,
            LogosToken::Shr => SyntaxKind::SHR,
            LogosToken::AmpAmp => SyntaxKind::AMP_AMP,
            LogosToken::PipePipe => SyntaxKind::PIPE_PIPE,
            LogosToken::PlusPlus => SyntaxKind::PLUS_PLUS,
            LogosToken::MinusMinus => SyntaxKind::MINUS_MINUS,
            LogosToken::AssignOp => SyntaxKind::ASSIGN_OP,
            LogosToken::LBrace => SyntaxKind::L_BRACE,
            LogosToken::RBrace => SyntaxKind::R_BRACE,
            LogosToken::LBracket => SyntaxKind::L_BRACKET,
            LogosToken::RBracket => SyntaxKind::R_BRACKET,
            LogosToken::LParen => SyntaxKind::L_PAREN,
            LogosToken::RParen => SyntaxKind::R_PAREN,
            LogosToken::Semicolon => SyntaxKind::SEMICOLON,
            LogosToken::Colon => SyntaxKind::COLON,
            LogosToken::Comma => SyntaxKind::COMMA,
            LogosToken::Dot => SyntaxKind::DOT,
            LogosToken::Hash => SyntaxKind::HASH,
            LogosToken::Question => SyntaxKind::QUESTION,
            LogosToken::Eq => SyntaxKind::EQ,
            LogosToken::Bang => SyntaxKind::BANG,
            LogosToken::Lt => SyntaxKind::LT,
            LogosToken::Gt => SyntaxKind::GT,
            LogosToken::Plus => SyntaxKind::PLUS,
            LogosToken::Minus => SyntaxKind::MINUS,
            LogosToken::Star => SyntaxKind::STAR,
            LogosToken::Slash => SyntaxKind::SLASH,
            LogosToken::Percent => SyntaxKind::PERCENT,
            LogosToken::Caret => SyntaxKind::CARET,
            LogosToken::Amp => SyntaxKind::AMP,
            LogosToken::Pipe => SyntaxKind::PIPE,
            LogosToken::Tilde => SyntaxKind::TILDE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<SyntaxKind> {
        tokenize(input).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_identifiers_and_punctuation() {
        assert_eq!(
            kinds("a::b->c"),
            vec![
                SyntaxKind::IDENT,
                SyntaxKind::COLON_COLON,
                SyntaxKind::IDENT,
                SyntaxKind::ARROW,
                SyntaxKind::IDENT,
            ]
        );
    }

    #[test]
    fn test_comments_are_dropped_but_newlines_kept() {
        assert_eq!(
            kinds("x // c\n/* a\n b */ y"),
            vec![SyntaxKind::IDENT, SyntaxKind::NEWLINE, SyntaxKind::IDENT]
        );
    }

    #[test]
    fn test_line_and_column_tracking() {
        let tokens = tokenize("int a;\n  b = 1;");
        let b = tokens.iter().find(|t| t.text == "b").unwrap();
        assert_eq!((b.line, b.column), (1, 2));

        let tokens = tokenize("/* one\ntwo */ z");
        let z = tokens.iter().find(|t| t.text == "z").unwrap();
        assert_eq!((z.line, z.column), (1, 7));
    }

    #[test]
    fn test_line_continuation_is_trivia() {
        assert_eq!(
            kinds("#define A \\\n 1"),
            vec![
                SyntaxKind::HASH,
                SyntaxKind::IDENT,
                SyntaxKind::IDENT,
                SyntaxKind::NUMBER,
            ]
        );
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            kinds(r#"0x1F 3.5e+2 "s\"q" 'c' L"w""#),
            vec![
                SyntaxKind::NUMBER,
                SyntaxKind::NUMBER,
                SyntaxKind::STRING,
                SyntaxKind::CHAR,
                SyntaxKind::STRING,
            ]
        );
    }
}
