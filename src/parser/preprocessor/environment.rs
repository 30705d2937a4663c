//! Macro definitions and the macro environment.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::base::{FilePath, Name, Position};
use crate::parser::SyntaxKind;

/// One token of a macro replacement list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroToken {
    pub kind: SyntaxKind,
    pub text: Name,
    /// Whitespace preceded the token in the definition.
    pub spaced: bool,
}

/// A `#define` (or, with `hidden`, an `#undef`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Macro {
    pub name: Name,
    /// `None` for object-like macros.
    pub params: Option<Vec<Name>>,
    pub variadic: bool,
    pub body: Vec<MacroToken>,
    pub file: FilePath,
    /// Position of the macro name in the defining file.
    pub position: Position,
    /// Set for `#undef` records; merging such a record removes the macro.
    pub hidden: bool,
}

impl Macro {
    pub fn is_function_like(&self) -> bool {
        self.params.is_some()
    }

    /// Index of a parameter name, `__VA_ARGS__` mapping to the variadic slot.
    pub fn param_index(&self, name: &str) -> Option<usize> {
        let params = self.params.as_ref()?;
        if self.variadic && name == "__VA_ARGS__" {
            return Some(params.len());
        }
        params.iter().position(|p| p == name)
    }

    /// Replacement list as source text.
    pub fn body_text(&self) -> String {
        let mut text = String::new();
        for (idx, token) in self.body.iter().enumerate() {
            if idx > 0 && token.spaced {
                text.push(' ');
            }
            text.push_str(&token.text);
        }
        text
    }

    /// `#define` line equivalent to this macro.
    pub fn definition_text(&self) -> String {
        if self.hidden {
            return format!("#undef {}", self.name);
        }
        let mut text = format!("#define {}", self.name);
        if let Some(params) = &self.params {
            let mut names: Vec<&str> = params.iter().map(|p| p.as_str()).collect();
            if self.variadic {
                names.push("...");
            }
            text.push('(');
            text.push_str(&names.join(", "));
            text.push(')');
        }
        let body = self.body_text();
        if !body.is_empty() {
            text.push(' ');
            text.push_str(&body);
        }
        text
    }
}

/// The set of macros visible at a point of preprocessing.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    macros: FxHashMap<Name, Arc<Macro>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a definition; hidden (`#undef`) records remove the name.
    pub fn remember(&mut self, def: Arc<Macro>) {
        if def.hidden {
            self.macros.remove(&def.name);
        } else {
            self.macros.insert(def.name.clone(), def);
        }
    }

    pub fn add_macros(&mut self, defs: &[Arc<Macro>]) {
        for def in defs {
            self.remember(Arc::clone(def));
        }
    }

    pub fn resolve(&self, name: &str) -> Option<&Arc<Macro>> {
        self.macros.get(name)
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    pub fn reset(&mut self) {
        self.macros.clear();
    }

    /// Macros sorted by name.
    pub fn sorted(&self) -> Vec<&Arc<Macro>> {
        let mut macros: Vec<_> = self.macros.values().collect();
        macros.sort_by(|a, b| a.name.cmp(&b.name));
        macros
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object_macro(name: &str, body: &str, hidden: bool) -> Arc<Macro> {
        Arc::new(Macro {
            name: Name::new(name),
            params: None,
            variadic: false,
            body: vec![MacroToken {
                kind: SyntaxKind::NUMBER,
                text: Name::new(body),
                spaced: true,
            }],
            file: FilePath::new("/t.h"),
            position: Position::default(),
            hidden,
        })
    }

    #[test]
    fn test_undef_record_removes_macro() {
        let mut env = Environment::new();
        env.remember(object_macro("FOO", "1", false));
        assert!(env.is_defined("FOO"));
        env.remember(object_macro("FOO", "", true));
        assert!(!env.is_defined("FOO"));
    }

    #[test]
    fn test_definition_text() {
        let def = object_macro("FOO", "1", false);
        assert_eq!(def.definition_text(), "#define FOO 1");
    }
}
