//! Renderings for recognised method calls that don't map to a plain
//!  operator: LIKE patterns, IN lists and SQL function wrapping.

use super::{Error, Result, Traversal, literal};
use crate::{ast::Node, ast::Value, methods::LikePattern};

impl<'c, 'a> Traversal<'c, 'a> {
    /// `member [NOT] LIKE 'pattern'`. The argument is compiled as an ordinary
    ///  string literal first and the wildcards go just inside its quotes.
    pub(super) fn like(
        &mut self,
        member: &'a Node,
        argument: &'a Node,
        pattern: LikePattern,
        negated: bool,
    ) -> Result<()> {
        let mut literal = self.scratch(|t| t.node(argument))?;
        if literal.len() < 2 || !literal.starts_with('\'') || !literal.ends_with('\'') {
            return Err(Error::UnsupportedValue(format!(
                "LIKE pattern must be a string literal, got {literal}"
            )));
        }
        match pattern {
            LikePattern::Prefix => literal.insert(literal.len() - 1, '%'),
            LikePattern::Suffix => literal.insert(1, '%'),
            LikePattern::Infix => {
                literal.insert(1, '%');
                literal.insert(literal.len() - 1, '%');
            }
        }

        self.node(member)?;
        if negated {
            self.out.push_str(" NOT");
        }
        self.out.push_str(" LIKE ");
        self.out.push_str(&literal);
        Ok(())
    }

    /// `element [NOT] IN (v1, v2, ...)`. The collection is a captured value and
    ///  is written out element by element.
    pub(super) fn in_list(&mut self, list: &'a Node, element: &'a Node, negated: bool) -> Result<()> {
        let items = match list.unwrap_delegates() {
            Node::Constant(v) => v,
            Node::Parameter(index) => self.frames.resolve(*index)?,
            other => {
                return Err(Error::MalformedTree(format!(
                    "collection for IN is not a captured value: {other:?}"
                )));
            }
        };
        let Value::List(items) = items else {
            return Err(Error::UnsupportedValue(format!(
                "IN needs a collection, got {items:?}"
            )));
        };

        // `x IN ()` is a syntax error; an empty collection contains nothing.
        if items.is_empty() {
            self.out.push_str(if negated { "1 = 1" } else { "1 = 0" });
            return Ok(());
        }

        self.node(element)?;
        if negated {
            self.out.push_str(" NOT");
        }
        self.out.push_str(" IN (");
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            literal::write_literal(item, &mut self.out)?;
        }
        self.out.push(')');
        Ok(())
    }

    /// `NAME(argument)`
    pub(super) fn function_call(&mut self, name: &str, argument: &'a Node) -> Result<()> {
        self.out.push_str(name);
        self.out.push('(');
        self.node(argument)?;
        self.out.push(')');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        ast::*,
        compile::{Compiler, CompilerConfig, Error},
    };

    fn sql(tree: &Node) -> Result<String, Error> {
        Compiler::new(CompilerConfig::new()).compile(tree)
    }

    #[test]
    fn like_needs_string_literal() {
        // name.startsWith(lastName)
        let tree = lambda(
            1,
            call(
                field(param(0), "getName"),
                Owner::Text,
                "startsWith",
                vec![field(param(0), "getLastName")],
            ),
        );
        assert!(matches!(sql(&tree), Err(Error::UnsupportedValue(_))));
    }

    #[test]
    fn like_keeps_escapes_inside_quotes() {
        let tree = lambda(
            1,
            call(
                field(param(0), "getName"),
                Owner::Text,
                "contains",
                vec![constant("O'B")],
            ),
        );
        assert_eq!(sql(&tree).unwrap(), r"name LIKE '%O\'B%'");
    }

    #[test]
    fn empty_collection() {
        let ids: Vec<i64> = vec![];
        let contains = call(
            constant(ids),
            Owner::Collection,
            "contains",
            vec![field(param(0), "getId")],
        );
        assert_eq!(sql(&lambda(1, contains.clone())).unwrap(), "1 = 0");
        assert_eq!(sql(&lambda(1, not(contains))).unwrap(), "1 = 1");
    }

    #[test]
    fn collection_elements_are_literals() {
        let tree = lambda(
            1,
            call(
                constant(vec!["a", "b'c"]),
                Owner::Collection,
                "contains",
                vec![field(param(0), "getName")],
            ),
        );
        assert_eq!(sql(&tree).unwrap(), r"name IN ('a', 'b\'c')");
    }

    #[test]
    fn collection_must_be_a_list() {
        let tree = lambda(
            1,
            call(
                constant(3),
                Owner::Collection,
                "contains",
                vec![field(param(0), "getId")],
            ),
        );
        assert!(matches!(sql(&tree), Err(Error::UnsupportedValue(_))));
    }
}
