use crate::{
    ast::{Lambda, Member, Node, OperatorKind, Owner, Value},
    column::{self, IdentifierQuote},
    methods::{MethodKey, Rule, RuleTable},
    table::TableNameSource,
};

mod frames;
mod literal;
mod rewrite;

use frames::ArgumentStack;
pub use literal::escape_string;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unsupported method call: {0}")]
    UnsupportedMethod(MethodKey),
    #[error("Operator {op:?} cannot be used as a {position} operator")]
    UnsupportedOperator {
        op: OperatorKind,
        position: &'static str,
    },
    #[error("Value has no SQL form here: {0}")]
    UnsupportedValue(String),
    #[error("Root of the expression tree is not a lambda")]
    NotALambda,
    #[error("Parameter {0} used with no active argument frame")]
    NoArgumentFrame(usize),
    #[error("Parameter {index} is out of range of the active argument frame ({len} values)")]
    ParameterOutOfRange { index: usize, len: usize },
    #[error("Parameter {0} is not bound to a captured value")]
    UnboundParameter(usize),
    #[error("Method {0} called with an incorrect number of arguments (got {1})")]
    IncorrectArgCount(String, usize),
    #[error("Lambda taking {expected} parameters invoked with {got} arguments")]
    ArgumentCountMismatch { expected: usize, got: usize },
    #[error("Malformed expression tree: {0}")]
    MalformedTree(String),
}

/// The two failure classes callers care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The tree is well formed but uses something there is no SQL rendering
    ///  for.
    UnsupportedConstruct,
    /// The tree breaks the shape the compiler relies on.
    MalformedTree,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedMethod(_)
            | Self::UnsupportedOperator { .. }
            | Self::UnsupportedValue(_) => ErrorKind::UnsupportedConstruct,
            Self::NotALambda
            | Self::NoArgumentFrame(_)
            | Self::ParameterOutOfRange { .. }
            | Self::UnboundParameter(_)
            | Self::IncorrectArgCount(..)
            | Self::ArgumentCountMismatch { .. }
            | Self::MalformedTree(_) => ErrorKind::MalformedTree,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Settings that stay fixed across `compile` calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Prefix for every column reference; bare column names when `None`.
    pub table_name: Option<String>,
    pub quote_identifiers: bool,
    pub quote: IdentifierQuote,
}

impl CompilerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Qualified and quoted column references for `table`.
    pub fn for_table(table: impl Into<String>) -> Self {
        Self {
            table_name: Some(table.into()),
            quote_identifiers: true,
            ..Self::default()
        }
    }

    /// Like `for_table`, with the table looked up by record type. Falls back
    ///  to bare columns when the source doesn't know the record.
    pub fn for_record(source: &impl TableNameSource, record: &str) -> Self {
        match source.table_name(record) {
            Some(table) => Self::for_table(table),
            None => Self::default(),
        }
    }

    pub fn table(mut self, table: Option<impl Into<String>>) -> Self {
        self.table_name = table.map(Into::into);
        self
    }

    pub fn quoted(mut self, quote_identifiers: bool) -> Self {
        self.quote_identifiers = quote_identifiers;
        self
    }

    pub fn quote_style(mut self, quote: IdentifierQuote) -> Self {
        self.quote = quote;
        self
    }

    fn quote(&self) -> Option<IdentifierQuote> {
        self.quote_identifiers.then_some(self.quote)
    }
}

/// Turns predicate and selector trees into SQL fragments. A `Compiler` is
///  immutable; every `compile` call gets its own traversal state, so one
///  instance can serve any number of threads.
///
/// ```rust
/// # use lambda_sql::{ast::*, compile::{Compiler, CompilerConfig}};
/// // person -> person.getAge() > 50 && person.isActive()
/// let tree = lambda(1, and(
///     binary(OperatorKind::GreaterThan, field(param(0), "getAge"), constant(50)),
///     field(param(0), "isActive"),
/// ));
/// let compiler = Compiler::new(CompilerConfig::for_table("person"));
/// assert_eq!(
///     compiler.compile(&tree).unwrap(),
///     "`person`.`age` > 50 AND `person`.`active`"
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    config: CompilerConfig,
    rules: RuleTable,
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self {
            config,
            rules: RuleTable::builtin(),
        }
    }

    pub fn with_rules(config: CompilerConfig, rules: RuleTable) -> Self {
        Self { config, rules }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Compiles a tree whose root is a lambda.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn compile(&self, tree: &Node) -> Result<String> {
        match tree.unwrap_delegates() {
            Node::Lambda(root) => self.compile_lambda(root),
            _ => Err(Error::NotALambda),
        }
    }

    pub fn compile_lambda(&self, root: &Lambda) -> Result<String> {
        let mut traversal = Traversal::new(self);
        traversal.lambda(root, false)?;
        tracing::debug!(sql = %traversal.out, "compiled lambda");
        Ok(traversal.out)
    }
}

/// Compiles without any table qualification or quoting.
pub fn to_sql(tree: &Node) -> Result<String> {
    Compiler::new(CompilerConfig::default()).compile(tree)
}

/// Compiles with every column qualified by `table` and quoted.
pub fn to_sql_with_table(tree: &Node, table: &str) -> Result<String> {
    Compiler::new(CompilerConfig::for_table(table)).compile(tree)
}

pub fn to_sql_with_options(
    tree: &Node,
    table: Option<&str>,
    quote_identifiers: bool,
) -> Result<String> {
    let config = CompilerConfig::new()
        .table(table)
        .quoted(quote_identifiers);
    Compiler::new(config).compile(tree)
}

/// Compiles with qualified, quoted columns. An explicit `table` wins;
///  otherwise the table is looked up from the root lambda's record type.
pub fn to_sql_for(
    tree: &Node,
    table: Option<&str>,
    source: &impl TableNameSource,
) -> Result<String> {
    let config = match (table, tree.unwrap_delegates()) {
        (Some(table), _) => CompilerConfig::for_table(table),
        (
            None,
            Node::Lambda(Lambda {
                record: Some(record),
                ..
            }),
        ) => CompilerConfig::for_record(source, record),
        (None, _) => CompilerConfig::default(),
    };
    Compiler::new(config).compile(tree)
}

/// State for a single `compile` call.
struct Traversal<'c, 'a> {
    compiler: &'c Compiler,
    out: String,
    frames: ArgumentStack<'a>,
    /// The predicate body proper: the first lambda body that isn't just a
    ///  composition of other lambdas. A disjunction here needs no
    ///  parentheses.
    body: Option<&'a Node>,
}

impl<'c, 'a> Traversal<'c, 'a> {
    fn new(compiler: &'c Compiler) -> Self {
        Self {
            compiler,
            out: String::new(),
            frames: ArgumentStack::new(),
            body: None,
        }
    }

    fn node(&mut self, node: &'a Node) -> Result<()> {
        match node {
            Node::Lambda(l) => self.lambda(l, false),
            Node::Binary { op, left, right } => {
                if !op.is_binary() {
                    return Err(Error::UnsupportedOperator {
                        op: *op,
                        position: "binary",
                    });
                }
                let parenthesize = *op == OperatorKind::LogicalOr && !self.is_body(node);
                self.comparison(*op, left, right, parenthesize)
            }
            Node::Unary { op, operand } => self.unary(*op, operand),
            Node::Member(m) => self.member(m, &[], false),
            Node::Constant(v) => self.value(v),
            Node::Parameter(index) => {
                let value = self.frames.resolve(*index)?;
                self.value(value)
            }
            Node::Invocation { target, arguments } => self.invocation(target, arguments),
            Node::Delegate(inner) => self.node(inner),
        }
    }

    /// Compiles the body of `l`, negated when `negated` is set.
    fn lambda(&mut self, l: &'a Lambda, negated: bool) -> Result<()> {
        if self.body.is_none() && !self.is_composition(&l.body) {
            self.body = Some(l.body.unwrap_delegates());
        }
        if negated {
            self.not(&l.body)
        } else {
            self.node(&l.body)
        }
    }

    fn is_body(&self, node: &Node) -> bool {
        self.body.is_some_and(|b| std::ptr::eq(b, node))
    }

    /// Whether `node` only invokes another lambda.
    fn is_composition(&self, node: &'a Node) -> bool {
        match node.unwrap_delegates() {
            Node::Invocation { target, .. } => self.lambda_target(target).is_some(),
            _ => false,
        }
    }

    /// The lambda `target` denotes, if any. Parameters are looked through
    ///  without counting as a use.
    fn lambda_target(&self, target: &'a Node) -> Option<&'a Lambda> {
        match target.unwrap_delegates() {
            Node::Parameter(index) => match self.frames.peek(*index) {
                Some(Value::Lambda(l)) => Some(l.as_ref()),
                _ => None,
            },
            other => other.as_lambda(),
        }
    }

    fn invocation(&mut self, target: &'a Node, arguments: &'a [Node]) -> Result<()> {
        let target = target.unwrap_delegates();
        if let Some(l) = self.lambda_target(target) {
            return self.invoke_lambda(target, l, arguments, false);
        }

        match target {
            Node::Member(m) => self.member(m, arguments, false),
            other => Err(Error::MalformedTree(format!(
                "invocation target is neither a lambda nor a method: {other:?}"
            ))),
        }
    }

    /// Compiles the body of `l` against a new frame holding the values
    ///  `arguments` supply. `target` is the node `l` was found through.
    fn invoke_lambda(
        &mut self,
        target: &'a Node,
        l: &'a Lambda,
        arguments: &'a [Node],
        negated: bool,
    ) -> Result<()> {
        if let Node::Parameter(index) = target {
            self.frames.resolve(*index)?;
        }
        if l.parameter_count != arguments.len() {
            return Err(Error::ArgumentCountMismatch {
                expected: l.parameter_count,
                got: arguments.len(),
            });
        }
        tracing::trace!(depth = self.frames.depth(), negated, "invoking nested lambda");
        let bound = arguments
            .iter()
            .map(|a| self.bound_value(a))
            .collect::<Result<Vec<_>>>()?;
        self.frames.push(bound);
        let result = self.lambda(l, negated);
        self.frames.pop();
        result
    }

    /// The captured value an invocation argument supplies, if it supplies
    ///  one. Anything else (typically the record itself) leaves its slot
    ///  unbound.
    fn bound_value(&mut self, argument: &'a Node) -> Result<Option<&'a Value>> {
        match argument.unwrap_delegates() {
            Node::Constant(v) => Ok(Some(v)),
            Node::Parameter(index) => self.frames.try_resolve(*index),
            _ => Ok(None),
        }
    }

    fn member(&mut self, m: &'a Member, arguments: &'a [Node], negated: bool) -> Result<()> {
        let compiler = self.compiler;
        match compiler.rules.get(m.owner, &m.accessor, arguments.len()) {
            Some(rule) => {
                tracing::trace!(accessor = %m.accessor, ?rule, negated, "rewriting method call");
                self.rule(m, rule, arguments, negated)
            }
            None if arguments.is_empty() && m.owner == Owner::Record => {
                self.column(&m.accessor);
                Ok(())
            }
            None if compiler.rules.knows(m.owner, &m.accessor) => Err(Error::IncorrectArgCount(
                format!("{}::{}", m.owner, m.accessor),
                arguments.len(),
            )),
            None => Err(Error::UnsupportedMethod(MethodKey::new(
                m.owner,
                m.accessor.clone(),
                arguments.len(),
            ))),
        }
    }

    fn rule(
        &mut self,
        m: &'a Member,
        rule: &Rule,
        arguments: &'a [Node],
        negated: bool,
    ) -> Result<()> {
        let instance = || {
            m.instance.as_deref().ok_or_else(|| {
                Error::MalformedTree(format!("{} called without an instance", m.accessor))
            })
        };
        let argument = || {
            arguments.first().ok_or_else(|| {
                Error::IncorrectArgCount(format!("{}::{}", m.owner, m.accessor), 0)
            })
        };

        match rule {
            Rule::Comparator(op) => {
                let op = if negated {
                    op.negated().ok_or(Error::UnsupportedOperator {
                        op: *op,
                        position: "negated comparator",
                    })?
                } else {
                    *op
                };
                self.comparison(op, instance()?, argument()?, false)
            }
            Rule::Like(pattern) => self.like(instance()?, argument()?, *pattern, negated),
            Rule::InList => self.in_list(instance()?, argument()?, negated),
            Rule::Function(name) => self.function_call(name, instance()?),
            Rule::DatePart(part) => self.function_call(&part.to_string(), instance()?),
            Rule::Aggregate(aggregate) => self.function_call(&aggregate.to_string(), argument()?),
        }
    }

    fn comparison(
        &mut self,
        op: OperatorKind,
        left: &'a Node,
        right: &'a Node,
        parenthesize: bool,
    ) -> Result<()> {
        // NULL has no literal that compares: `x = NULL` is never true
        if matches!(op, OperatorKind::Equal | OperatorKind::NotEqual) && self.is_null(right)? {
            let test = if op == OperatorKind::Equal {
                OperatorKind::IsNull
            } else {
                OperatorKind::IsNotNull
            };
            return self.null_test(test, left);
        }

        if parenthesize {
            self.out.push('(');
        }
        self.node(left)?;
        self.out.push(' ');
        self.out.push_str(op.sql());
        self.out.push(' ');
        self.node(right)?;
        if parenthesize {
            self.out.push(')');
        }
        Ok(())
    }

    /// Whether `node` is a null literal, either written directly or supplied
    ///  through the active argument frame. A parameter found to be null
    ///  counts as used.
    fn is_null(&mut self, node: &'a Node) -> Result<bool> {
        match node.unwrap_delegates() {
            Node::Constant(Value::Null) => Ok(true),
            Node::Parameter(index) if matches!(self.frames.peek(*index), Some(Value::Null)) => {
                self.frames.resolve(*index)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn null_test(&mut self, op: OperatorKind, operand: &'a Node) -> Result<()> {
        self.node(operand)?;
        self.out.push_str(op.sql());
        Ok(())
    }

    fn unary(&mut self, op: OperatorKind, operand: &'a Node) -> Result<()> {
        match op {
            OperatorKind::IsNull | OperatorKind::IsNotNull => self.null_test(op, operand),
            OperatorKind::TypeConvert => self.node(operand),
            OperatorKind::LogicalNot => self.not(operand),
            _ => Err(Error::UnsupportedOperator {
                op,
                position: "unary",
            }),
        }
    }

    /// Compiles the negation of `operand`. Invoked lambdas are followed so
    ///  the negation lands on the body they compile to.
    fn not(&mut self, operand: &'a Node) -> Result<()> {
        let inner = operand.unwrap_delegates();
        match inner {
            Node::Unary {
                op: op @ (OperatorKind::IsNull | OperatorKind::IsNotNull),
                operand,
            } => {
                let op = op.negated().unwrap_or(*op);
                return self.null_test(op, operand);
            }
            Node::Unary {
                op: OperatorKind::LogicalNot,
                operand,
            } => return self.node(operand),
            Node::Invocation { target, arguments } => {
                let target = target.unwrap_delegates();
                if let Some(l) = self.lambda_target(target) {
                    return self.invoke_lambda(target, l, arguments, true);
                }
                if let Node::Member(m) = target
                    && self.negatable(m, arguments.len())
                {
                    return self.member(m, arguments, true);
                }
            }
            Node::Member(m) if self.negatable(m, 0) => return self.member(m, &[], true),
            // a disjunction below the body parenthesizes itself
            Node::Binary { op, .. } if *op != OperatorKind::LogicalOr || self.is_body(inner) => {
                self.out.push_str("!(");
                self.node(inner)?;
                self.out.push(')');
                return Ok(());
            }
            _ => {}
        }
        self.out.push_str(OperatorKind::LogicalNot.sql());
        self.node(operand)
    }

    fn negatable(&self, m: &Member, arity: usize) -> bool {
        self.compiler
            .rules
            .get(m.owner, &m.accessor, arity)
            .is_some_and(Rule::negatable)
    }

    fn value(&mut self, value: &'a Value) -> Result<()> {
        match value {
            Value::Lambda(l) => self.lambda(l, false),
            other => literal::write_literal(other, &mut self.out),
        }
    }

    fn column(&mut self, accessor: &str) {
        let config = &self.compiler.config;
        column::qualify(
            config.table_name.as_deref(),
            &column::column_name(accessor),
            config.quote(),
            &mut self.out,
        );
    }

    /// Runs `f` against an empty buffer and returns what it wrote.
    fn scratch(&mut self, f: impl FnOnce(&mut Self) -> Result<()>) -> Result<String> {
        let saved = std::mem::take(&mut self.out);
        let result = f(self);
        let written = std::mem::replace(&mut self.out, saved);
        result.map(|_| written)
    }
}
