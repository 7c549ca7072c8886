//! Condition compiler for WHERE and HAVING clauses

use super::common::placeholders;
use super::prepare::FieldRef;
use crate::operator::{IntoOperator, Logic, Operator};
use crate::{Error, Result, Value};

const CONTEXT: &str = "QueryBuilder::prepare_conditions";

/// Right-hand side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A literal bound through a placeholder
    Value(Value),
    /// Another column, quoted and compared directly
    Column(FieldRef),
    /// A list of literals for `IN` / `NOT IN`
    List(Vec<Value>),
    /// SQL emitted verbatim, e.g. a nested SELECT
    Raw(String),
}

impl Operand {
    pub fn raw(sql: impl Into<String>) -> Self {
        Operand::Raw(sql.into())
    }
}

/// Trait for types usable as the right-hand side of a condition
pub trait IntoOperand {
    fn into_operand(self) -> Operand;
}

impl IntoOperand for Operand {
    fn into_operand(self) -> Operand {
        self
    }
}

impl IntoOperand for FieldRef {
    fn into_operand(self) -> Operand {
        Operand::Column(self)
    }
}

impl IntoOperand for Value {
    fn into_operand(self) -> Operand {
        Operand::Value(self)
    }
}

macro_rules! impl_scalar_operand {
    ($($t:ty),* $(,)?) => {
        $(
            impl IntoOperand for $t {
                fn into_operand(self) -> Operand {
                    Operand::Value(Value::from(self))
                }
            }
        )*
    };
}

impl_scalar_operand!(bool, i32, i64, u32, f32, f64, &str, String, &String, ());

impl<T> IntoOperand for Option<T>
where
    T: Into<Value>,
{
    fn into_operand(self) -> Operand {
        Operand::Value(Value::from(self))
    }
}

impl<T> IntoOperand for Vec<T>
where
    T: Into<Value>,
{
    fn into_operand(self) -> Operand {
        Operand::List(self.into_iter().map(Into::into).collect())
    }
}

impl<T, const N: usize> IntoOperand for [T; N]
where
    T: Into<Value>,
{
    fn into_operand(self) -> Operand {
        Operand::List(self.into_iter().map(Into::into).collect())
    }
}

impl<T> IntoOperand for &[T]
where
    T: Into<Value> + Clone,
{
    fn into_operand(self) -> Operand {
        Operand::List(self.iter().cloned().map(Into::into).collect())
    }
}

/// A single condition node
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `(field OP operand)`
    Compare {
        field: FieldRef,
        operator: Operator,
        operand: Operand,
    },
    /// `(field IS [NOT] NULL)`
    Null { field: FieldRef, negated: bool },
    /// Caller-written SQL, emitted verbatim without parameters
    Raw(String),
}

impl Condition {
    /// Build a comparison from a field, an operator and an operand
    pub fn compare<F, O, V>(field: F, operator: O, operand: V) -> Result<Self>
    where
        F: Into<FieldRef>,
        O: IntoOperator,
        V: IntoOperand,
    {
        let operator = operator.into_operator()?;
        let operand = operand.into_operand();
        if let Operand::List(values) = &operand {
            if !operator.is_membership() {
                return Err(Error::invalid_type("value", CONTEXT, "a scalar for this operator"));
            }
            if values.is_empty() {
                return Err(Error::empty_input("value", CONTEXT));
            }
        }
        Ok(Condition::Compare {
            field: field.into(),
            operator,
            operand,
        })
    }

    /// Shorthand form: `=` for scalars, `IN` for lists, and the strings
    /// `is null` / `is not null` for null checks
    pub fn shorthand<F, V>(field: F, operand: V) -> Result<Self>
    where
        F: Into<FieldRef>,
        V: IntoOperand,
    {
        let field = field.into();
        let operand = operand.into_operand();
        if let Operand::Value(Value::String(s)) = &operand {
            let lowered = s.trim().to_lowercase();
            if lowered == "is null" {
                return Ok(Condition::is_null(field));
            }
            if lowered == "is not null" {
                return Ok(Condition::is_not_null(field));
            }
        }
        let operator = match operand {
            Operand::List(_) => Operator::In,
            _ => Operator::Eq,
        };
        Condition::compare(field, operator, operand)
    }

    pub fn is_null(field: impl Into<FieldRef>) -> Self {
        Condition::Null {
            field: field.into(),
            negated: false,
        }
    }

    pub fn is_not_null(field: impl Into<FieldRef>) -> Self {
        Condition::Null {
            field: field.into(),
            negated: true,
        }
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Condition::Raw(sql.into())
    }

    fn compile_into(&self, sql: &mut String, params: &mut Vec<Value>) -> Result<()> {
        match self {
            Condition::Compare {
                field,
                operator,
                operand,
            } => {
                let field = field.render()?;
                let rhs = match operand {
                    Operand::Value(value) => {
                        params.push(value.clone());
                        "?".to_string()
                    }
                    Operand::List(values) => {
                        if values.is_empty() {
                            return Err(Error::empty_input("value", CONTEXT));
                        }
                        params.extend(values.iter().cloned());
                        placeholders(values.len())
                    }
                    Operand::Column(column) => column.render()?,
                    Operand::Raw(raw) => raw.trim().to_string(),
                };
                let rhs = if operator.is_membership() && !rhs.starts_with('(') {
                    format!("({rhs})")
                } else {
                    rhs
                };
                sql.push_str(&format!("({field} {operator} {rhs})"));
            }
            Condition::Null { field, negated } => {
                let keyword = if *negated { "IS NOT NULL" } else { "IS NULL" };
                sql.push_str(&format!("({} {keyword})", field.render()?));
            }
            Condition::Raw(raw) => {
                if raw.trim().is_empty() {
                    return Err(Error::empty_input("where", CONTEXT));
                }
                sql.push_str(raw);
            }
        }
        Ok(())
    }
}

/// Trait for values that convert into one condition node
pub trait IntoCondition {
    fn into_condition(self) -> Result<Condition>;
}

impl IntoCondition for Condition {
    fn into_condition(self) -> Result<Condition> {
        Ok(self)
    }
}

impl<F, V> IntoCondition for (F, V)
where
    F: Into<FieldRef>,
    V: IntoOperand,
{
    fn into_condition(self) -> Result<Condition> {
        Condition::shorthand(self.0, self.1)
    }
}

impl<F, O, V> IntoCondition for (F, O, V)
where
    F: Into<FieldRef>,
    O: IntoOperator,
    V: IntoOperand,
{
    fn into_condition(self) -> Result<Condition> {
        Condition::compare(self.0, self.1, self.2)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Condition(Condition),
    Logic(Logic),
}

/// A sequence of conditions interleaved with logic tokens.
///
/// Adjacent conditions added with [`Conditions::push`] are concatenated with
/// no connector in between.
///
/// ```
/// use quarry_core::Conditions;
///
/// let fragment = Conditions::new()
///     .push(("a", "=", 1))
///     .and(("b", 2))
///     .compile()
///     .unwrap();
/// assert_eq!(fragment.sql, "(`a` = ?) AND (`b` = ?)");
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Conditions {
    nodes: Vec<Node>,
    error: Option<Error>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// A caller-written condition string, used verbatim
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::new().push(Condition::raw(sql))
    }

    /// Append a condition with no connector
    pub fn push(mut self, condition: impl IntoCondition) -> Self {
        match condition.into_condition() {
            Ok(condition) => self.nodes.push(Node::Condition(condition)),
            Err(err) => self.record(err),
        }
        self
    }

    /// Append a bare logic token such as `"or"`
    pub fn logic(mut self, token: &str) -> Self {
        match token.parse::<Logic>() {
            Ok(logic) => self.nodes.push(Node::Logic(logic)),
            Err(err) => self.record(err),
        }
        self
    }

    pub fn and(mut self, condition: impl IntoCondition) -> Self {
        self.nodes.push(Node::Logic(Logic::And));
        self.push(condition)
    }

    pub fn or(mut self, condition: impl IntoCondition) -> Self {
        self.nodes.push(Node::Logic(Logic::Or));
        self.push(condition)
    }

    pub fn not(mut self, condition: impl IntoCondition) -> Self {
        self.nodes.push(Node::Logic(Logic::Not));
        self.push(condition)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.error.is_none()
    }

    fn record(&mut self, err: Error) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    /// Compile into SQL text and the parameters it references, in order
    pub fn compile(&self) -> Result<Fragment> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        if self.nodes.is_empty() {
            return Err(Error::empty_input("where", CONTEXT));
        }
        let mut fragment = Fragment::default();
        for node in &self.nodes {
            match node {
                Node::Condition(condition) => {
                    condition.compile_into(&mut fragment.sql, &mut fragment.params)?
                }
                Node::Logic(logic) => fragment.sql.push_str(&format!(" {logic} ")),
            }
        }
        Ok(fragment)
    }
}

/// Trait for everything accepted by `where_` and `having`
pub trait IntoConditions {
    fn into_conditions(self) -> Conditions;
}

impl IntoConditions for Conditions {
    fn into_conditions(self) -> Conditions {
        self
    }
}

impl IntoConditions for Condition {
    fn into_conditions(self) -> Conditions {
        Conditions::new().push(self)
    }
}

impl IntoConditions for Vec<Condition> {
    fn into_conditions(self) -> Conditions {
        self.into_iter()
            .enumerate()
            .fold(Conditions::new(), |acc, (i, condition)| {
                if i == 0 {
                    acc.push(condition)
                } else {
                    acc.and(condition)
                }
            })
    }
}

impl IntoConditions for &str {
    fn into_conditions(self) -> Conditions {
        if self.trim().is_empty() {
            Conditions::new()
        } else {
            Conditions::raw(self)
        }
    }
}

impl IntoConditions for String {
    fn into_conditions(self) -> Conditions {
        self.as_str().into_conditions()
    }
}

impl<F, V> IntoConditions for (F, V)
where
    F: Into<FieldRef>,
    V: IntoOperand,
{
    fn into_conditions(self) -> Conditions {
        Conditions::new().push(self)
    }
}

impl<F, O, V> IntoConditions for (F, O, V)
where
    F: Into<FieldRef>,
    O: IntoOperator,
    V: IntoOperand,
{
    fn into_conditions(self) -> Conditions {
        Conditions::new().push(self)
    }
}

/// Compiled SQL text and its positional parameters
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fragment {
    pub sql: String,
    pub params: Vec<Value>,
}
