//! Token kinds produced by the lexer.
//!
//! Keywords are not distinguished here: whether `class` or `namespace` is a
//! keyword depends on the language dialect, so the lexer reports every word as
//! [`SyntaxKind::IDENT`] and [`super::keywords`] classifies it later.

/// All token kinds in C-family source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
#[allow(non_camel_case_types)]
pub enum SyntaxKind {
    // =========================================================================
    // TRIVIA
    // =========================================================================
    WHITESPACE = 0,
    NEWLINE,
    LINE_CONTINUATION,
    LINE_COMMENT,
    BLOCK_COMMENT,

    // =========================================================================
    // LITERALS
    // =========================================================================
    IDENT,  // identifier or keyword
    NUMBER, // 42, 0x1f, 3.14e2, 10u
    STRING, // "hello"
    CHAR,   // 'c'

    // =========================================================================
    // PUNCTUATION
    // =========================================================================
    L_BRACE,      // {
    R_BRACE,      // }
    L_BRACKET,    // [
    R_BRACKET,    // ]
    L_PAREN,      // (
    R_PAREN,      // )
    SEMICOLON,    // ;
    COLON,        // :
    COLON_COLON,  // ::
    COMMA,        // ,
    DOT,          // .
    DOT_STAR,     // .*
    ELLIPSIS,     // ...
    ARROW,        // ->
    ARROW_STAR,   // ->*
    HASH,         // #
    HASH_HASH,    // ##
    QUESTION,     // ?
    EQ,           // =
    EQ_EQ,        // ==
    BANG,         // !
    BANG_EQ,      // !=
    LT,           // <
    GT,           // >
    LT_EQ,        // <=
    GT_EQ,        // >=
    SHL,          // <<
    SHR,          // >>
    PLUS,         // +
    MINUS,        // -
    STAR,         // *
    SLASH,        // /
    PERCENT,      // %
    CARET,        // ^
    AMP,          // &
    AMP_AMP,      // &&
    PIPE,         // |
    PIPE_PIPE,    // ||
    TILDE,        // ~
    PLUS_PLUS,    // ++
    MINUS_MINUS,  // --
    ASSIGN_OP,    // += -= *= /= %= &= |= ^= <<= >>=

    ERROR,
}

impl SyntaxKind {
    /// Whitespace, comments and line continuations.
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            Self::WHITESPACE | Self::LINE_CONTINUATION | Self::LINE_COMMENT | Self::BLOCK_COMMENT
        )
    }

    pub fn is_literal(self) -> bool {
        matches!(self, Self::NUMBER | Self::STRING | Self::CHAR)
    }
}
