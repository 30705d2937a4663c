//! Keyword classification.
//!
//! Whether a word is reserved depends on the dialect: in C, `class`,
//! `namespace` or `this` are ordinary identifiers.

use crate::project::LanguageFeatures;

/// Keywords the declaration parser cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    // type keywords
    Void,
    Bool,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Signed,
    Unsigned,
    Auto,
    // declaration specifiers
    Const,
    Volatile,
    Static,
    Extern,
    Inline,
    Register,
    Mutable,
    Virtual,
    Explicit,
    Friend,
    Constexpr,
    Typedef,
    Template,
    Typename,
    // aggregates
    Class,
    Struct,
    Union,
    Enum,
    Namespace,
    Using,
    Operator,
    Public,
    Protected,
    Private,
    // statements
    If,
    Else,
    For,
    While,
    Do,
    Switch,
    Case,
    Default,
    Break,
    Continue,
    Return,
    Goto,
    Try,
    Catch,
    Throw,
    // expression keywords
    This,
    New,
    Delete,
    Sizeof,
    True,
    False,
    Nullptr,
    StaticCast,
    DynamicCast,
    ReinterpretCast,
    ConstCast,
    Decltype,
    Noexcept,
    Override,
    Final,
    StaticAssert,
    // Qt-style access sections
    Signals,
    Slots,
}

impl Keyword {
    /// Classify `text` under the given dialect.
    pub fn classify(text: &str, features: LanguageFeatures) -> Option<Keyword> {
        let common = match text {
            "void" => Some(Keyword::Void),
            "char" => Some(Keyword::Char),
            "short" => Some(Keyword::Short),
            "int" => Some(Keyword::Int),
            "long" => Some(Keyword::Long),
            "float" => Some(Keyword::Float),
            "double" => Some(Keyword::Double),
            "signed" => Some(Keyword::Signed),
            "unsigned" => Some(Keyword::Unsigned),
            "_Bool" => Some(Keyword::Bool),
            "const" => Some(Keyword::Const),
            "volatile" => Some(Keyword::Volatile),
            "static" => Some(Keyword::Static),
            "extern" => Some(Keyword::Extern),
            "inline" | "__inline" | "__inline__" => Some(Keyword::Inline),
            "register" => Some(Keyword::Register),
            "typedef" => Some(Keyword::Typedef),
            "struct" => Some(Keyword::Struct),
            "union" => Some(Keyword::Union),
            "enum" => Some(Keyword::Enum),
            "if" => Some(Keyword::If),
            "else" => Some(Keyword::Else),
            "for" => Some(Keyword::For),
            "while" => Some(Keyword::While),
            "do" => Some(Keyword::Do),
            "switch" => Some(Keyword::Switch),
            "case" => Some(Keyword::Case),
            "default" => Some(Keyword::Default),
            "break" => Some(Keyword::Break),
            "continue" => Some(Keyword::Continue),
            "return" => Some(Keyword::Return),
            "goto" => Some(Keyword::Goto),
            "sizeof" => Some(Keyword::Sizeof),
            _ => None,
        };
        if common.is_some() || !features.cxx {
            return common;
        }

        let cxx = match text {
            "bool" => Keyword::Bool,
            "mutable" => Keyword::Mutable,
            "virtual" => Keyword::Virtual,
            "explicit" => Keyword::Explicit,
            "friend" => Keyword::Friend,
            "template" => Keyword::Template,
            "typename" => Keyword::Typename,
            "class" => Keyword::Class,
            "namespace" => Keyword::Namespace,
            "using" => Keyword::Using,
            "operator" => Keyword::Operator,
            "public" => Keyword::Public,
            "protected" => Keyword::Protected,
            "private" => Keyword::Private,
            "try" => Keyword::Try,
            "catch" => Keyword::Catch,
            "throw" => Keyword::Throw,
            "this" => Keyword::This,
            "new" => Keyword::New,
            "delete" => Keyword::Delete,
            "true" => Keyword::True,
            "false" => Keyword::False,
            "static_cast" => Keyword::StaticCast,
            "dynamic_cast" => Keyword::DynamicCast,
            "reinterpret_cast" => Keyword::ReinterpretCast,
            "const_cast" => Keyword::ConstCast,
            "signals" | "Q_SIGNALS" if features.qt_keywords => Keyword::Signals,
            "slots" | "Q_SLOTS" if features.qt_keywords => Keyword::Slots,
            _ if features.cxx11 => match text {
                "auto" => Keyword::Auto,
                "constexpr" => Keyword::Constexpr,
                "nullptr" => Keyword::Nullptr,
                "decltype" => Keyword::Decltype,
                "noexcept" => Keyword::Noexcept,
                "static_assert" => Keyword::StaticAssert,
                "override" => Keyword::Override,
                "final" => Keyword::Final,
                _ => return None,
            },
            _ => return None,
        };
        Some(cxx)
    }

    /// Keywords that name (part of) a builtin type.
    pub fn is_builtin_type(self) -> bool {
        matches!(
            self,
            Keyword::Void
                | Keyword::Bool
                | Keyword::Char
                | Keyword::Short
                | Keyword::Int
                | Keyword::Long
                | Keyword::Float
                | Keyword::Double
                | Keyword::Signed
                | Keyword::Unsigned
                | Keyword::Auto
        )
    }

    /// Specifiers that may precede a declaration's type.
    pub fn is_decl_specifier(self) -> bool {
        matches!(
            self,
            Keyword::Const
                | Keyword::Volatile
                | Keyword::Static
                | Keyword::Extern
                | Keyword::Inline
                | Keyword::Register
                | Keyword::Mutable
                | Keyword::Virtual
                | Keyword::Explicit
                | Keyword::Friend
                | Keyword::Constexpr
                | Keyword::Typename
        )
    }

    pub fn is_class_key(self) -> bool {
        matches!(self, Keyword::Class | Keyword::Struct | Keyword::Union)
    }

    /// `override`/`final` are contextual: only keywords after a declarator.
    pub fn is_contextual(self) -> bool {
        matches!(self, Keyword::Override | Keyword::Final)
    }
}
