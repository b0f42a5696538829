//! Per-module build environment.
//!
//! An `EnvStore` maps variable names to ordered token lists, keeping the order
//! in which variables were first written. Writes append by default; a variable
//! can be marked as an override, in which case it replaces whatever an earlier
//! writer contributed when the store is rendered into an environment file.

use std::fmt;

/// How a variable's tokens combine with earlier writers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvOp {
    /// Extend earlier tokens (`+=`)
    Append,
    /// Replace earlier tokens (`:=`)
    Override,
}

impl fmt::Display for EnvOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvOp::Append => write!(f, "+="),
            EnvOp::Override => write!(f, ":="),
        }
    }
}

/// One variable in a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvVar {
    pub name: String,
    pub op: EnvOp,
    pub tokens: Vec<String>,
}

/// Ordered variable name -> tokens mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvStore {
    vars: Vec<EnvVar>,
}

impl EnvStore {
    /// Create an empty store.
    pub fn new() -> Self {
        EnvStore { vars: Vec::new() }
    }

    fn entry(&mut self, name: &str, op: EnvOp) -> &mut EnvVar {
        let pos = match self.vars.iter().position(|v| v.name == name) {
            Some(pos) => pos,
            None => {
                self.vars.push(EnvVar {
                    name: name.to_string(),
                    op,
                    tokens: Vec::new(),
                });
                self.vars.len() - 1
            }
        };
        &mut self.vars[pos]
    }

    /// Append a token to a variable, creating it if needed.
    pub fn append(&mut self, name: &str, token: impl Into<String>) {
        self.entry(name, EnvOp::Append).tokens.push(token.into());
    }

    /// Append several tokens to a variable.
    pub fn extend<I, S>(&mut self, name: &str, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let var = self.entry(name, EnvOp::Append);
        var.tokens.extend(tokens.into_iter().map(Into::into));
    }

    /// Replace a variable's tokens and mark it as an override.
    pub fn set_override<I, S>(&mut self, name: &str, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let var = self.entry(name, EnvOp::Override);
        var.op = EnvOp::Override;
        var.tokens = tokens.into_iter().map(Into::into).collect();
    }

    /// Fold another store into this one, respecting its operators.
    pub fn merge(&mut self, other: &EnvStore) {
        for var in &other.vars {
            match var.op {
                EnvOp::Append => self.extend(&var.name, var.tokens.iter().cloned()),
                EnvOp::Override => self.set_override(&var.name, var.tokens.iter().cloned()),
            }
        }
    }

    /// Tokens of a variable, if set.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.vars
            .iter()
            .find(|v| v.name == name)
            .map(|v| v.tokens.as_slice())
    }

    /// Whether the store defines `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.vars.iter().any(|v| v.name == name)
    }

    /// Variables in first-write order.
    pub fn iter(&self) -> impl Iterator<Item = &EnvVar> {
        self.vars.iter()
    }

    /// Variable names in first-write order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.iter().map(|v| v.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_keeps_token_order() {
        let mut env = EnvStore::new();
        env.append("USERINCLUDES", "-I/a/include");
        env.append("USERLIBS", "-L/a/lib");
        env.append("USERINCLUDES", "-I/b/include");

        assert_eq!(
            env.get("USERINCLUDES"),
            Some(&["-I/a/include".to_string(), "-I/b/include".to_string()][..])
        );
        assert_eq!(env.names().collect::<Vec<_>>(), vec!["USERINCLUDES", "USERLIBS"]);
    }

    #[test]
    fn test_override_replaces_tokens() {
        let mut env = EnvStore::new();
        env.extend("CXXFLAGS", ["-O2", "-g"]);
        env.set_override("CXXFLAGS", ["-O0"]);

        let var = env.iter().next().unwrap();
        assert_eq!(var.op, EnvOp::Override);
        assert_eq!(var.tokens, vec!["-O0"]);
        assert_eq!(env.len(), 1);
    }

    #[test]
    fn test_merge_respects_operators() {
        let mut base = EnvStore::new();
        base.append("USERINCLUDES", "-I/a/include");
        base.append("CXXFLAGS", "-O2");

        let mut user = EnvStore::new();
        user.append("USERINCLUDES", "-I/extra");
        user.set_override("CXXFLAGS", ["-O0"]);
        base.merge(&user);

        assert_eq!(base.get("USERINCLUDES").unwrap().len(), 2);
        assert_eq!(base.get("CXXFLAGS"), Some(&["-O0".to_string()][..]));
    }
}
