use crate::error::LaconError;
use crate::parser::Parser;
use crate::preprocess::preprocess;
use crate::resolver::ImportStack;
use crate::value::Value;
use crate::vars::VariableRegistry;
use serde::{Serialize, Serializer};
use std::env;
use std::path::{Path, PathBuf};

/// The result of a successful LACON compile.
/// Holds the final document value together with the variables the
/// document defined, and provides the serialization methods most
/// callers want.
#[derive(Debug)]
pub struct CompileResult {
    value: Value,
    variables: VariableRegistry,
}

impl Serialize for CompileResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.value.serialize(serializer)
    }
}

impl CompileResult {
    /// The compiled document value.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Variables defined in the document, in definition order. Imported
    /// files keep their variables to themselves.
    #[must_use]
    pub fn variables(&self) -> &VariableRegistry {
        &self.variables
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Serializes the compiled document into a pretty-printed JSON
    /// string. Object keys keep their source order.
    ///
    /// # Errors
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self)
    }

    /// Serializes the compiled document into a YAML string.
    ///
    /// # Errors
    /// Returns a `serde_yaml::Error` if serialization fails.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self)
    }
}

/// Compiles a LACON source string.
///
/// This is the primary entry point for processing LACON data. The
/// pipeline runs the emit preprocessor first, then the line parser, and
/// returns a [`CompileResult`] for serialization or inspection.
///
/// # Arguments
///
/// * `source` - The LACON source text.
/// * `source_path` - Where the text came from, if anywhere. Relative
///   `@import` paths resolve against this file's directory; with `None`
///   they resolve against the process working directory.
///
/// # Errors
///
/// Returns a `LaconError` for circular imports and unreadable imported
/// files. Malformed lines never fail the compile; they degrade to
/// literal values.
pub fn compile(source: &str, source_path: Option<&Path>) -> Result<CompileResult, LaconError> {
    let base_dir = base_dir_for(source_path);
    let expanded = preprocess(source);
    let mut imports = ImportStack::new();
    let (value, variables) = Parser::new(base_dir, &mut imports).parse_document(&expanded)?;
    Ok(CompileResult { value, variables })
}

/// Compiles a LACON source string straight to pretty-printed JSON.
///
/// # Errors
///
/// Fails under the same conditions as [`compile`], plus JSON
/// serialization errors.
pub fn compile_to_json(source: &str, source_path: Option<&Path>) -> Result<String, LaconError> {
    let result = compile(source, source_path)?;
    Ok(result.to_json()?)
}

fn base_dir_for(source_path: Option<&Path>) -> PathBuf {
    match source_path.and_then(Path::parent) {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
