#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Tree-sitter parser wrapper for Python source code.

use anyhow::{Context, Result, anyhow};
use tree_sitter::{Language, Node, Query, QueryCursor, StreamingIterator, Tree};

/// Query matching every function definition (methods included).
/// * `function`: the whole definition
/// * `params`: its parameter list
const FUNCTION_QUERY: &str = "(function_definition parameters: (parameters) @params) @function";

/// Parameter node kinds that never take an annotation.
const SEPARATOR_KINDS: &[&str] = &["keyword_separator", "positional_separator", "comment"];

/// Parameter node kinds that carry an annotation.
const TYPED_KINDS: &[&str] = &["typed_parameter", "typed_default_parameter"];

/// Returns the compiled tree-sitter Python language.
fn python_language() -> Language {
    tree_sitter_python::LANGUAGE.into()
}

/// A struct that wraps a tree-sitter parse tree and the source it came from.
pub struct Parser {
    /// The source code being parsed.
    code: String,
    /// The parse tree.
    tree: Tree,
    /// The tree-sitter Python grammar language.
    lang: Language,
}

/// Annotation counts for one function definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionHints {
    /// Function name.
    pub name:             String,
    /// Parameters that can carry an annotation.
    pub params:           usize,
    /// Of those, how many do.
    pub annotated_params: usize,
    /// Whether a `-> T` return annotation is present.
    pub annotated_return: bool,
}

impl FunctionHints {
    /// Annotatable slots: every parameter plus the return.
    pub fn slots(&self) -> usize {
        self.params + 1
    }

    /// Annotated slots.
    pub fn annotated_slots(&self) -> usize {
        self.annotated_params + usize::from(self.annotated_return)
    }
}

impl Parser {
    /// Parses `source_code` as Python.
    pub fn new(source_code: String) -> Result<Self> {
        let mut parser = tree_sitter::Parser::new();
        let language = python_language();

        parser
            .set_language(&language)
            .with_context(|| "Failed to load Python grammar")?;
        let tree = parser
            .parse(source_code.as_str(), None)
            .ok_or_else(|| anyhow!("Error parsing Python code"))?;

        Ok(Self {
            code: source_code,
            tree,
            lang: language,
        })
    }

    /// A getter for parser's source code.
    pub fn code(&self) -> &str {
        self.code.as_str()
    }

    /// True when tree-sitter had to recover from syntax errors.
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    /// Annotation counts for every function and method in the file, in source
    /// order.
    pub fn function_hints(&self) -> Result<Vec<FunctionHints>> {
        let query = Query::new(&self.lang, FUNCTION_QUERY)
            .with_context(|| format!("Failed to compile tree-sitter query: {FUNCTION_QUERY}"))?;
        let function_idx = query
            .capture_index_for_name("function")
            .context("Capture name function not present in query")?;
        let params_idx = query
            .capture_index_for_name("params")
            .context("Capture name params not present in query")?;

        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, self.tree.root_node(), self.code.as_bytes());
        let mut hints = Vec::new();

        while let Some(m) = matches.next() {
            let function = m.captures.iter().find(|c| c.index == function_idx);
            let params = m.captures.iter().find(|c| c.index == params_idx);
            if let (Some(function), Some(params)) = (function, params) {
                hints.push(self.hints_for(function.node, params.node)?);
            }
        }

        Ok(hints)
    }

    /// Counts annotations on a single definition.
    fn hints_for(&self, function: Node<'_>, params: Node<'_>) -> Result<FunctionHints> {
        let name = match function.child_by_field_name("name") {
            Some(node) => self.text(node)?.to_string(),
            None => String::new(),
        };
        let is_method = enclosing_class(function);

        let mut walker = params.walk();
        let mut total = 0;
        let mut annotated = 0;
        for (position, param) in params
            .named_children(&mut walker)
            .filter(|p| !SEPARATOR_KINDS.contains(&p.kind()))
            .enumerate()
        {
            if position == 0 && is_method {
                let first = self.param_name(param)?;
                if first == "self" || first == "cls" {
                    continue;
                }
            }
            total += 1;
            if TYPED_KINDS.contains(&param.kind()) {
                annotated += 1;
            }
        }

        Ok(FunctionHints {
            name,
            params: total,
            annotated_params: annotated,
            annotated_return: function.child_by_field_name("return_type").is_some(),
        })
    }

    /// Name bound by a parameter node, whatever its shape.
    fn param_name(&self, param: Node<'_>) -> Result<&str> {
        match param.kind() {
            "identifier" => self.text(param),
            _ => match param
                .child_by_field_name("name")
                .or_else(|| param.named_child(0))
            {
                Some(inner) => self.text(inner),
                None => Ok(""),
            },
        }
    }

    /// Source text under `node`.
    fn text(&self, node: Node<'_>) -> Result<&str> {
        node.utf8_text(self.code.as_bytes())
            .context("Cannot map node to source text")
    }
}

/// True when `function` is defined directly in a class body (possibly under
/// decorators).
fn enclosing_class(function: Node<'_>) -> bool {
    let mut node = function.parent();
    if node.is_some_and(|n| n.kind() == "decorated_definition") {
        node = node.and_then(|n| n.parent());
    }
    node.filter(|n| n.kind() == "block")
        .and_then(|n| n.parent())
        .is_some_and(|n| n.kind() == "class_definition")
}
