use std::{borrow::Cow, collections::HashMap};

use crate::ast::{OperatorKind, Owner};

/// Identifies a method independently of any host-language reflection: the
///  declaring type, the method name and the number of non-receiver
///  arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodKey {
    pub owner: Owner,
    pub name: Cow<'static, str>,
    pub arity: usize,
}

impl MethodKey {
    pub fn new(owner: Owner, name: impl Into<Cow<'static, str>>, arity: usize) -> Self {
        Self {
            owner,
            name: name.into(),
            arity,
        }
    }
}

impl std::fmt::Display for MethodKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}/{}", self.owner, self.name, self.arity)
    }
}

/// Where the `%` wildcards go in a LIKE pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikePattern {
    /// `'x%'`
    Prefix,
    /// `'%x'`
    Suffix,
    /// `'%x%'`
    Infix,
}

/// SQL date/time field extraction functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display, strum_macros::EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum DatePart {
    Second,
    Minute,
    Hour,
    DayOfWeek,
    Day,
    DayOfYear,
    Month,
    Year,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display, strum_macros::EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Aggregate {
    Sum,
    Min,
    Max,
}

/// What a recognised method call turns into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// `a.isAfter(b)` => `a > b`
    Comparator(OperatorKind),
    /// `a.startsWith('x')` => `a LIKE 'x%'`
    Like(LikePattern),
    /// `list.contains(a)` => `a IN (1, 2, 3)`
    InList,
    /// `a.length()` => `LENGTH(a)`
    Function(Cow<'static, str>),
    /// `a.getYear()` => `YEAR(a)`
    DatePart(DatePart),
    /// `sum(a)` => `SUM(a)`
    Aggregate(Aggregate),
}

impl Rule {
    /// Whether a logical NOT directly above the call can be folded into the
    ///  rule's output.
    pub fn negatable(&self) -> bool {
        match self {
            Rule::Comparator(op) => op.negated().is_some(),
            Rule::Like(_) | Rule::InList => true,
            Rule::Function(_) | Rule::DatePart(_) | Rule::Aggregate(_) => false,
        }
    }
}

/// The table of known methods the compiler consults by key. Starts out with
///  the builtin rules; callers may add or override entries.
#[derive(Debug, Clone)]
pub struct RuleTable {
    // keyed by owner and arity first so lookups by `&str` name don't allocate
    rules: HashMap<(Owner, usize), HashMap<Cow<'static, str>, Rule>>,
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RuleTable {
    /// A table with no rules at all: every accessor is a column.
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    pub fn builtin() -> Self {
        use Owner::*;
        let mut table = Self::empty();

        table.insert(MethodKey::new(Text, "equals", 1), Rule::Comparator(OperatorKind::Equal));
        table.insert(MethodKey::new(Any, "equals", 1), Rule::Comparator(OperatorKind::Equal));
        for owner in [Date, Time, DateTime] {
            table.insert(
                MethodKey::new(owner, "isAfter", 1),
                Rule::Comparator(OperatorKind::GreaterThan),
            );
            table.insert(
                MethodKey::new(owner, "isBefore", 1),
                Rule::Comparator(OperatorKind::LessThan),
            );
        }

        table.insert(MethodKey::new(Text, "startsWith", 1), Rule::Like(LikePattern::Prefix));
        table.insert(MethodKey::new(Text, "endsWith", 1), Rule::Like(LikePattern::Suffix));
        table.insert(MethodKey::new(Text, "contains", 1), Rule::Like(LikePattern::Infix));
        table.insert(MethodKey::new(Text, "length", 0), Rule::Function("LENGTH".into()));
        table.insert(MethodKey::new(Collection, "contains", 1), Rule::InList);

        for owner in [Time, DateTime] {
            table.insert(MethodKey::new(owner, "getSecond", 0), Rule::DatePart(DatePart::Second));
            table.insert(MethodKey::new(owner, "getMinute", 0), Rule::DatePart(DatePart::Minute));
            table.insert(MethodKey::new(owner, "getHour", 0), Rule::DatePart(DatePart::Hour));
        }
        for owner in [Date, DateTime] {
            table.insert(
                MethodKey::new(owner, "getDayOfWeek", 0),
                Rule::DatePart(DatePart::DayOfWeek),
            );
            table.insert(MethodKey::new(owner, "getDayOfMonth", 0), Rule::DatePart(DatePart::Day));
            table.insert(
                MethodKey::new(owner, "getDayOfYear", 0),
                Rule::DatePart(DatePart::DayOfYear),
            );
            table.insert(MethodKey::new(owner, "getMonthValue", 0), Rule::DatePart(DatePart::Month));
            table.insert(MethodKey::new(owner, "getYear", 0), Rule::DatePart(DatePart::Year));
        }

        table.insert(MethodKey::new(Aggregates, "sum", 1), Rule::Aggregate(Aggregate::Sum));
        table.insert(MethodKey::new(Aggregates, "min", 1), Rule::Aggregate(Aggregate::Min));
        table.insert(MethodKey::new(Aggregates, "max", 1), Rule::Aggregate(Aggregate::Max));

        table
    }

    /// Adds a rule, returning the one it replaced.
    pub fn insert(&mut self, key: MethodKey, rule: Rule) -> Option<Rule> {
        self.rules
            .entry((key.owner, key.arity))
            .or_default()
            .insert(key.name, rule)
    }

    pub fn remove(&mut self, key: &MethodKey) -> Option<Rule> {
        let names = self.rules.get_mut(&(key.owner, key.arity))?;
        let removed = names.remove(key.name.as_ref());
        if names.is_empty() {
            self.rules.remove(&(key.owner, key.arity));
        }
        removed
    }

    pub fn get(&self, owner: Owner, name: &str, arity: usize) -> Option<&Rule> {
        self.rules.get(&(owner, arity))?.get(name)
    }

    /// Whether any rule is registered for this name on this owner,
    ///  regardless of arity.
    pub fn knows(&self, owner: Owner, name: &str) -> bool {
        self.rules
            .iter()
            .any(|((o, _), names)| *o == owner && names.contains_key(name))
    }

    pub fn len(&self) -> usize {
        self.rules.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
