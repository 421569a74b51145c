use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Operators that can appear on `Binary` and `Unary` nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OperatorKind {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    LogicalAnd,
    LogicalOr,
    LogicalNot,
    IsNull,
    IsNotNull,
    TypeConvert,
}

impl OperatorKind {
    /// The SQL text emitted for this operator.
    pub fn sql(&self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::GreaterThan => ">",
            Self::GreaterOrEqual => ">=",
            Self::LessThan => "<",
            Self::LessOrEqual => "<=",
            Self::LogicalAnd => "AND",
            Self::LogicalOr => "OR",
            Self::LogicalNot => "!",
            Self::IsNull => " IS NULL",
            Self::IsNotNull => " IS NOT NULL",
            Self::TypeConvert => "",
        }
    }

    /// The operator that yields the opposite truth value, for the operators
    ///  where one exists.
    pub fn negated(&self) -> Option<Self> {
        match self {
            Self::Equal => Some(Self::NotEqual),
            Self::NotEqual => Some(Self::Equal),
            Self::GreaterThan => Some(Self::LessOrEqual),
            Self::LessOrEqual => Some(Self::GreaterThan),
            Self::LessThan => Some(Self::GreaterOrEqual),
            Self::GreaterOrEqual => Some(Self::LessThan),
            Self::IsNull => Some(Self::IsNotNull),
            Self::IsNotNull => Some(Self::IsNull),
            _ => None,
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::Equal
                | Self::NotEqual
                | Self::GreaterThan
                | Self::GreaterOrEqual
                | Self::LessThan
                | Self::LessOrEqual
        )
    }

    pub fn is_binary(&self) -> bool {
        self.is_comparison() || matches!(self, Self::LogicalAnd | Self::LogicalOr)
    }
}

/// The declaring type of an accessor or method. This is the node-level type
///  tag the introspection side attaches to every `Member`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display, strum_macros::EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Owner {
    /// The record type the lambda is written against (or one reachable
    ///  from it, like `person.getCar()`).
    Record,
    Text,
    Collection,
    Date,
    Time,
    DateTime,
    /// Methods declared on the root object type, e.g. generic `equals`.
    Any,
    /// Static helpers that stand in for SQL aggregate functions.
    Aggregates,
}

/// A field read or method reference.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Member {
    /// `None` for static calls.
    pub instance: Option<Box<Node>>,
    pub owner: Owner,
    pub accessor: String,
}

/// A whole compiled unit: the predicate or selector body plus the number of
///  parameters the lambda takes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Lambda {
    pub body: Box<Node>,
    pub parameter_count: usize,
    /// Name of the record type the lambda is written against, used to look
    ///  up a table name when none is given explicitly.
    pub record: Option<String>,
}

/// Literal and captured values.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    List(Vec<Value>),
    /// A nested predicate, e.g. the argument of `p.and(other)`.
    Lambda(Box<Lambda>),
}

/// The expression tree handed over by the introspection side. The compiler
///  only ever borrows it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Node {
    Lambda(Lambda),
    Binary {
        op: OperatorKind,
        left: Box<Node>,
        right: Box<Node>,
    },
    Unary {
        op: OperatorKind,
        operand: Box<Node>,
    },
    Member(Member),
    Constant(Value),
    /// Index into the currently active argument frame.
    Parameter(usize),
    Invocation {
        target: Box<Node>,
        arguments: Vec<Node>,
    },
    Delegate(Box<Node>),
}

impl Node {
    /// Strips any `Delegate` wrappers.
    pub fn unwrap_delegates(&self) -> &Node {
        let mut node = self;
        while let Node::Delegate(inner) = node {
            node = inner;
        }
        node
    }

    /// Returns the lambda this node denotes directly, without consulting any
    ///  argument frame.
    pub fn as_lambda(&self) -> Option<&Lambda> {
        match self.unwrap_delegates() {
            Node::Lambda(l) => Some(l),
            Node::Constant(Value::Lambda(l)) => Some(l.as_ref()),
            _ => None,
        }
    }
}

// Construction helpers. The introspection side normally builds trees, but
//  these keep hand-written trees in tests and benches readable.

pub fn lambda(parameter_count: usize, body: Node) -> Node {
    Node::Lambda(Lambda {
        body: Box::new(body),
        parameter_count,
        record: None,
    })
}

/// A lambda over the named record type.
pub fn lambda_over(record: &str, parameter_count: usize, body: Node) -> Node {
    Node::Lambda(Lambda {
        body: Box::new(body),
        parameter_count,
        record: Some(record.to_string()),
    })
}

pub fn binary(op: OperatorKind, left: Node, right: Node) -> Node {
    Node::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

pub fn unary(op: OperatorKind, operand: Node) -> Node {
    Node::Unary {
        op,
        operand: Box::new(operand),
    }
}

pub fn not(operand: Node) -> Node {
    unary(OperatorKind::LogicalNot, operand)
}

pub fn and(left: Node, right: Node) -> Node {
    binary(OperatorKind::LogicalAnd, left, right)
}

pub fn or(left: Node, right: Node) -> Node {
    binary(OperatorKind::LogicalOr, left, right)
}

pub fn param(index: usize) -> Node {
    Node::Parameter(index)
}

pub fn constant(value: impl Into<Value>) -> Node {
    Node::Constant(value.into())
}

/// A read of `accessor` on a record, e.g. `field(param(0), "getAge")`.
pub fn field(instance: Node, accessor: &str) -> Node {
    Node::Member(Member {
        instance: Some(Box::new(instance)),
        owner: Owner::Record,
        accessor: accessor.to_string(),
    })
}

/// A call of `owner::name` on `instance` with the given arguments.
pub fn call(instance: Node, owner: Owner, name: &str, arguments: Vec<Node>) -> Node {
    Node::Invocation {
        target: Box::new(Node::Member(Member {
            instance: Some(Box::new(instance)),
            owner,
            accessor: name.to_string(),
        })),
        arguments,
    }
}

/// A call of a static helper, like an aggregate wrapper.
pub fn call_static(owner: Owner, name: &str, arguments: Vec<Node>) -> Node {
    Node::Invocation {
        target: Box::new(Node::Member(Member {
            instance: None,
            owner,
            accessor: name.to_string(),
        })),
        arguments,
    }
}

/// Invocation of a lambda-valued target with the given arguments.
pub fn invoke(target: Node, arguments: Vec<Node>) -> Node {
    Node::Invocation {
        target: Box::new(target),
        arguments,
    }
}

impl From<Lambda> for Value {
    fn from(l: Lambda) -> Self {
        Value::Lambda(Box::new(l))
    }
}
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}
impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i.into())
    }
}
impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}
impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}
impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}
impl From<NaiveTime> for Value {
    fn from(t: NaiveTime) -> Self {
        Value::Time(t)
    }
}
impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}
impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negation_is_an_involution() {
        for op in [
            OperatorKind::Equal,
            OperatorKind::NotEqual,
            OperatorKind::GreaterThan,
            OperatorKind::GreaterOrEqual,
            OperatorKind::LessThan,
            OperatorKind::LessOrEqual,
            OperatorKind::IsNull,
            OperatorKind::IsNotNull,
        ] {
            assert_eq!(op.negated().and_then(|n| n.negated()), Some(op));
        }
        assert_eq!(OperatorKind::LogicalAnd.negated(), None);
    }

    #[test]
    fn delegates_unwrap_to_lambda() {
        let l = lambda(1, constant(true));
        let wrapped = Node::Delegate(Box::new(Node::Delegate(Box::new(l.clone()))));
        assert_eq!(wrapped.unwrap_delegates(), &l);
        assert!(wrapped.as_lambda().is_some());
        assert!(param(0).as_lambda().is_none());
    }

    #[test]
    fn owner_names_parse() {
        assert_eq!("date_time".parse::<Owner>(), Ok(Owner::DateTime));
        assert_eq!(Owner::Collection.to_string(), "collection");
        assert!("widget".parse::<Owner>().is_err());
    }
}
