// Structured queries and statements understood by a RegistryStore
//
// Predicates are built either with the helpers below or by parsing a raw
// fragment (see `predicate.rs`). Parameter slots (`?`) are bound before the
// query reaches a store; the SQL rendering is only used for logging.

use super::schema::Table;
use super::value::{Row, Value};
use super::StoreError;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Column(String),
    Value(Value),
    /// Positional parameter, zero-based
    Param(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    NotLike,
}

impl CmpOp {
    fn as_sql(&self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "<>",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::Like => "LIKE",
            CmpOp::NotLike => "NOT LIKE",
        }
    }
}

/// Row filter with SQL semantics: comparisons involving NULL are unknown,
/// and only rows for which the whole predicate is true are selected.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    True,
    Compare {
        left: Operand,
        op: CmpOp,
        right: Operand,
    },
    IsNull {
        operand: Operand,
        negated: bool,
    },
    In {
        operand: Operand,
        list: Vec<Operand>,
        negated: bool,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

pub fn col(name: &str) -> Operand {
    Operand::Column(name.to_ascii_uppercase())
}

pub fn val(value: impl Into<Value>) -> Operand {
    Operand::Value(value.into())
}

pub fn param(index: usize) -> Operand {
    Operand::Param(index)
}

impl Predicate {
    pub fn compare(left: Operand, op: CmpOp, right: Operand) -> Self {
        Predicate::Compare { left, op, right }
    }

    /// `column = value`
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self::compare(col(column), CmpOp::Eq, val(value))
    }

    /// `column = ?n`
    pub fn eq_param(column: &str, index: usize) -> Self {
        Self::compare(col(column), CmpOp::Eq, param(index))
    }

    pub fn and(self, other: Predicate) -> Self {
        match (self, other) {
            (Predicate::True, p) | (p, Predicate::True) => p,
            (Predicate::And(mut items), Predicate::And(more)) => {
                items.extend(more);
                Predicate::And(items)
            }
            (Predicate::And(mut items), p) => {
                items.push(p);
                Predicate::And(items)
            }
            (a, b) => Predicate::And(vec![a, b]),
        }
    }

    pub fn or(self, other: Predicate) -> Self {
        match (self, other) {
            (Predicate::Or(mut items), p) => {
                items.push(p);
                Predicate::Or(items)
            }
            (a, b) => Predicate::Or(vec![a, b]),
        }
    }

    pub fn all(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        predicates
            .into_iter()
            .fold(Predicate::True, |acc, p| acc.and(p))
    }

    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    /// Replace parameter slots with values.
    pub fn bind(&self, params: &[Value]) -> Result<Predicate, StoreError> {
        self.map_operands(&mut |operand| match operand {
            Operand::Param(i) => params
                .get(*i)
                .cloned()
                .map(Operand::Value)
                .ok_or_else(|| {
                    StoreError::MalformedQuery(format!("no value bound for parameter {}", i + 1))
                }),
            other => Ok(other.clone()),
        })
    }

    /// Resolve column references against `table`, normalising their names.
    pub fn resolve(&self, table: Table) -> Result<Predicate, StoreError> {
        self.map_operands(&mut |operand| match operand {
            Operand::Column(name) => table
                .resolve_column(name)
                .map(|c| Operand::Column(c.to_string()))
                .ok_or_else(|| StoreError::UnknownColumn {
                    table: table.name().to_string(),
                    column: name.clone(),
                }),
            other => Ok(other.clone()),
        })
    }

    /// Number of parameter slots referenced
    pub fn param_count(&self) -> usize {
        let mut max = 0;
        self.visit_operands(&mut |operand| {
            if let Operand::Param(i) = operand {
                max = max.max(i + 1);
            }
        });
        max
    }

    fn visit_operands(&self, f: &mut impl FnMut(&Operand)) {
        match self {
            Predicate::True => {}
            Predicate::Compare { left, right, .. } => {
                f(left);
                f(right);
            }
            Predicate::IsNull { operand, .. } => f(operand),
            Predicate::In { operand, list, .. } => {
                f(operand);
                list.iter().for_each(|o| f(o));
            }
            Predicate::And(items) | Predicate::Or(items) => {
                items.iter().for_each(|p| p.visit_operands(f))
            }
            Predicate::Not(inner) => inner.visit_operands(f),
        }
    }

    fn map_operands(
        &self,
        f: &mut impl FnMut(&Operand) -> Result<Operand, StoreError>,
    ) -> Result<Predicate, StoreError> {
        Ok(match self {
            Predicate::True => Predicate::True,
            Predicate::Compare { left, op, right } => Predicate::Compare {
                left: f(left)?,
                op: *op,
                right: f(right)?,
            },
            Predicate::IsNull { operand, negated } => Predicate::IsNull {
                operand: f(operand)?,
                negated: *negated,
            },
            Predicate::In {
                operand,
                list,
                negated,
            } => Predicate::In {
                operand: f(operand)?,
                list: list.iter().map(|o| f(o)).collect::<Result<_, _>>()?,
                negated: *negated,
            },
            Predicate::And(items) => Predicate::And(
                items
                    .iter()
                    .map(|p| p.map_operands(f))
                    .collect::<Result<_, _>>()?,
            ),
            Predicate::Or(items) => Predicate::Or(
                items
                    .iter()
                    .map(|p| p.map_operands(f))
                    .collect::<Result<_, _>>()?,
            ),
            Predicate::Not(inner) => Predicate::Not(Box::new(inner.map_operands(f)?)),
        })
    }

    /// True if the row is selected by this predicate.
    pub fn matches(&self, row: &Row) -> Result<bool, StoreError> {
        Ok(self.evaluate(row)? == Some(true))
    }

    /// Three-valued evaluation; `None` is SQL UNKNOWN.
    fn evaluate(&self, row: &Row) -> Result<Option<bool>, StoreError> {
        match self {
            Predicate::True => Ok(Some(true)),
            Predicate::Compare { left, op, right } => {
                let l = operand_value(left, row)?;
                let r = operand_value(right, row)?;
                Ok(compare(&l, *op, &r))
            }
            Predicate::IsNull { operand, negated } => {
                let v = operand_value(operand, row)?;
                Ok(Some(v.is_null() != *negated))
            }
            Predicate::In {
                operand,
                list,
                negated,
            } => {
                let v = operand_value(operand, row)?;
                let mut result = Some(false);
                for item in list {
                    match compare(&v, CmpOp::Eq, &operand_value(item, row)?) {
                        Some(true) => {
                            result = Some(true);
                            break;
                        }
                        None => result = None,
                        Some(false) => {}
                    }
                }
                Ok(result.map(|b| b != *negated))
            }
            Predicate::And(items) => {
                let mut result = Some(true);
                for p in items {
                    match p.evaluate(row)? {
                        Some(false) => return Ok(Some(false)),
                        None => result = None,
                        Some(true) => {}
                    }
                }
                Ok(result)
            }
            Predicate::Or(items) => {
                let mut result = Some(false);
                for p in items {
                    match p.evaluate(row)? {
                        Some(true) => return Ok(Some(true)),
                        None => result = None,
                        Some(false) => {}
                    }
                }
                Ok(result)
            }
            Predicate::Not(inner) => Ok(inner.evaluate(row)?.map(|b| !b)),
        }
    }
}

fn operand_value(operand: &Operand, row: &Row) -> Result<Value, StoreError> {
    match operand {
        Operand::Column(name) => Ok(row.get(name).cloned().unwrap_or(Value::Null)),
        Operand::Value(v) => Ok(v.clone()),
        Operand::Param(i) => Err(StoreError::MalformedQuery(format!(
            "parameter {} was never bound",
            i + 1
        ))),
    }
}

fn compare(left: &Value, op: CmpOp, right: &Value) -> Option<bool> {
    match op {
        CmpOp::Like => like_values(left, right),
        CmpOp::NotLike => like_values(left, right).map(|b| !b),
        CmpOp::Eq => left.compare(right).map(|o| o.is_eq()),
        CmpOp::Ne => left.compare(right).map(|o| o.is_ne()),
        CmpOp::Lt => left.compare(right).map(|o| o.is_lt()),
        CmpOp::Le => left.compare(right).map(|o| o.is_le()),
        CmpOp::Gt => left.compare(right).map(|o| o.is_gt()),
        CmpOp::Ge => left.compare(right).map(|o| o.is_ge()),
    }
}

fn like_values(text: &Value, pattern: &Value) -> Option<bool> {
    if text.is_null() || pattern.is_null() {
        return None;
    }
    Some(like(&text.to_string(), &pattern.to_string()))
}

/// SQL LIKE: `%` matches any run of characters, `_` exactly one.
fn like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    // matched[j]: pattern[..j] matches text[..i]
    let mut matched = vec![false; pattern.len() + 1];
    matched[0] = true;
    for j in 1..=pattern.len() {
        matched[j] = matched[j - 1] && pattern[j - 1] == '%';
    }
    for c in text {
        let mut next = vec![false; pattern.len() + 1];
        for j in 1..=pattern.len() {
            next[j] = match pattern[j - 1] {
                '%' => next[j - 1] || matched[j],
                '_' => matched[j - 1],
                p => matched[j - 1] && p == c,
            };
        }
        matched = next;
    }
    matched[pattern.len()]
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Column(name) => f.write_str(name),
            Operand::Value(v) => f.write_str(&v.to_sql_literal()),
            Operand::Param(_) => f.write_str("?"),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::True => f.write_str("1=1"),
            Predicate::Compare { left, op, right } => {
                write!(f, "{} {} {}", left, op.as_sql(), right)
            }
            Predicate::IsNull { operand, negated } => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{} IS {}NULL", operand, not)
            }
            Predicate::In {
                operand,
                list,
                negated,
            } => {
                let not = if *negated { "NOT " } else { "" };
                let items: Vec<String> = list.iter().map(|o| o.to_string()).collect();
                write!(f, "{} {}IN ({})", operand, not, items.join(", "))
            }
            Predicate::And(items) => write_joined(f, items, " AND "),
            Predicate::Or(items) => write_joined(f, items, " OR "),
            Predicate::Not(inner) => write!(f, "NOT ({})", inner),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Predicate], sep: &str) -> fmt::Result {
    let parts: Vec<String> = items
        .iter()
        .map(|p| match p {
            Predicate::And(_) | Predicate::Or(_) => format!("({})", p),
            _ => p.to_string(),
        })
        .collect();
    f.write_str(&parts.join(sep))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

/// `SELECT * FROM table WHERE filter ORDER BY ...`
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub table: Table,
    pub filter: Predicate,
    pub order_by: Vec<OrderBy>,
}

impl Select {
    pub fn from(table: Table) -> Self {
        Self {
            table,
            filter: Predicate::True,
            order_by: Vec::new(),
        }
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = std::mem::replace(&mut self.filter, Predicate::True).and(predicate);
        self
    }

    pub fn order_by(mut self, column: &str) -> Self {
        self.order_by.push(OrderBy {
            column: column.to_ascii_uppercase(),
            descending: false,
        });
        self
    }

    pub fn order_by_desc(mut self, column: &str) -> Self {
        self.order_by.push(OrderBy {
            column: column.to_ascii_uppercase(),
            descending: true,
        });
        self
    }

    pub fn bind(&self, params: &[Value]) -> Result<Select, StoreError> {
        Ok(Select {
            table: self.table,
            filter: self.filter.bind(params)?,
            order_by: self.order_by.clone(),
        })
    }

    /// Sort rows by the ORDER BY clause; stable for ties.
    pub fn sort(&self, rows: &mut [Row]) {
        if self.order_by.is_empty() {
            return;
        }
        rows.sort_by(|a, b| {
            for key in &self.order_by {
                let left = a.get(&key.column).cloned().unwrap_or_default();
                let right = b.get(&key.column).cloned().unwrap_or_default();
                let ord = left.sort_cmp(&right);
                let ord = if key.descending { ord.reverse() } else { ord };
                if ord.is_ne() {
                    return ord;
                }
            }
            std::cmp::Ordering::Equal
        });
    }
}

impl fmt::Display for Select {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT * FROM {}", self.table)?;
        if self.filter != Predicate::True {
            write!(f, " WHERE {}", self.filter)?;
        }
        if !self.order_by.is_empty() {
            let keys: Vec<String> = self
                .order_by
                .iter()
                .map(|o| {
                    if o.descending {
                        format!("{} DESC", o.column)
                    } else {
                        o.column.clone()
                    }
                })
                .collect();
            write!(f, " ORDER BY {}", keys.join(", "))?;
        }
        Ok(())
    }
}

/// Write statements
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Insert {
        table: Table,
        row: Row,
    },
    Update {
        table: Table,
        assignments: Row,
        filter: Predicate,
    },
    Delete {
        table: Table,
        filter: Predicate,
    },
}

impl Statement {
    pub fn insert(table: Table, row: Row) -> Self {
        Statement::Insert { table, row }
    }

    pub fn update(table: Table, assignments: Row, filter: Predicate) -> Self {
        Statement::Update {
            table,
            assignments,
            filter,
        }
    }

    pub fn delete(table: Table, filter: Predicate) -> Self {
        Statement::Delete { table, filter }
    }

    pub fn table(&self) -> Table {
        match self {
            Statement::Insert { table, .. }
            | Statement::Update { table, .. }
            | Statement::Delete { table, .. } => *table,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Insert { table, row } => {
                let (names, values): (Vec<&str>, Vec<String>) =
                    row.columns().map(|(c, v)| (c, v.to_sql_literal())).unzip();
                write!(
                    f,
                    "INSERT INTO {} ({}) VALUES ({})",
                    table,
                    names.join(", "),
                    values.join(", ")
                )
            }
            Statement::Update {
                table,
                assignments,
                filter,
            } => {
                let sets: Vec<String> = assignments
                    .columns()
                    .map(|(c, v)| format!("{}={}", c, v.to_sql_literal()))
                    .collect();
                write!(f, "UPDATE {} SET {} WHERE {}", table, sets.join(", "), filter)
            }
            Statement::Delete { table, filter } => {
                write!(f, "DELETE FROM {} WHERE {}", table, filter)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(start: &str, end: &str, ordinal: i64) -> Row {
        Row::new()
            .with("START_NODE_ID", start)
            .with("END_NODE_ID", end)
            .with("ORDINAL", ordinal)
    }

    #[test]
    fn test_like_wildcards() {
        assert!(like("nodes=A,B", "nodes=%"));
        assert!(like("abc", "a_c"));
        assert!(!like("abc", "a_"));
        assert!(like("", "%"));
        assert!(!like("abc", "b%"));
    }

    #[test]
    fn test_null_comparison_is_not_selected_even_when_negated() {
        let row = Row::new().with("NODE_ID", Value::Null);
        let p = Predicate::eq("NODE_ID", "a");
        assert!(!p.matches(&row).unwrap());
        assert!(!p.clone().negate().matches(&row).unwrap());

        let is_null = Predicate::IsNull {
            operand: col("NODE_ID"),
            negated: false,
        };
        assert!(is_null.matches(&row).unwrap());
    }

    #[test]
    fn test_or_with_unknown_branch() {
        let row = route("*", "*", 1);
        let p = Predicate::eq("MISSING", "x").or(Predicate::eq("START_NODE_ID", "*"));
        assert!(p.matches(&row).unwrap());
    }

    #[test]
    fn test_bind_and_unbound_parameter() {
        let p = Predicate::eq_param("START_NODE_ID", 0).and(Predicate::eq_param("END_NODE_ID", 1));
        assert_eq!(p.param_count(), 2);
        assert!(p.matches(&route("a", "b", 1)).is_err());
        assert!(p.bind(&[Value::from("a")]).is_err());

        let bound = p.bind(&["a".into(), "b".into()]).unwrap();
        assert!(bound.matches(&route("a", "b", 1)).unwrap());
        assert!(!bound.matches(&route("a", "c", 1)).unwrap());
    }

    #[test]
    fn test_resolve_rejects_unknown_column() {
        let p = Predicate::eq("platform_id", "p1");
        assert!(matches!(
            p.resolve(Table::Routes),
            Err(StoreError::UnknownColumn { .. })
        ));
        assert!(Predicate::eq("ordinal", 1).resolve(Table::Routes).is_ok());
    }

    #[test]
    fn test_select_sort_by_ordinal() {
        let select = Select::from(Table::Routes).order_by("ORDINAL");
        let mut rows = vec![route("a", "b", 3), route("a", "b", 1), route("a", "b", 2)];
        select.sort(&mut rows);
        let ordinals: Vec<i64> = rows.iter().filter_map(|r| r.get_i64("ORDINAL")).collect();
        assert_eq!(ordinals, vec![1, 2, 3]);
    }

    #[test]
    fn test_sql_rendering() {
        let select = Select::from(Table::Routes)
            .filter(Predicate::eq("START_NODE_ID", "o'n"))
            .order_by("ORDINAL");
        assert_eq!(
            select.to_string(),
            "SELECT * FROM FABRIC.ROUTES WHERE START_NODE_ID = 'o''n' ORDER BY ORDINAL"
        );
        let delete = Statement::delete(
            Table::NodeNeighbours,
            Predicate::eq("NODE_ID", "n1").and(Predicate::eq("NEIGHBOUR_ID", "n2")),
        );
        assert_eq!(
            delete.to_string(),
            "DELETE FROM FABRIC.NODE_NEIGHBOURS WHERE NODE_ID = 'n1' AND NEIGHBOUR_ID = 'n2'"
        );
    }
}
