//! Module: query::compile
//! Responsibility: render a select tree to parameterized query text.
//! Boundary: every literal travels through the parameter map; every name is
//! validated before it reaches the text buffer.

use crate::{
    db::{
        direction::Direction,
        query::{
            builder::{CompiledQuery, SqlBuilder, param_label},
            condition::Condition,
            order::Order,
            select::{BinaryOperationSelect, Select, SelectBounds, SetOperation},
        },
    },
    error::InternalError,
    obs::sink::{MetricsEvent, record},
    value::Value,
};

/// Compile a select into one query string plus bound parameters.
///
/// Bounded operands of a set operation are rejected here, not when the select
/// was composed.
pub fn compile(select: &Select) -> Result<CompiledQuery, InternalError> {
    let mut builder = SqlBuilder::new();
    render_select(&mut builder, select)?;

    Ok(finish(builder))
}

/// Compile `SELECT COUNT(*) AS count FROM (<select>)`.
pub fn compile_count(select: &Select) -> Result<CompiledQuery, InternalError> {
    let mut builder = SqlBuilder::new();
    builder.push("SELECT COUNT(*) AS count FROM (");
    render_select(&mut builder, select)?;
    builder.push(")");

    Ok(finish(builder))
}

fn finish(builder: SqlBuilder) -> CompiledQuery {
    let compositions = builder.compositions();
    let compiled = builder.finish();
    record(MetricsEvent::QueryCompiled {
        compositions,
        params: u64::try_from(compiled.params.len()).unwrap_or(u64::MAX),
    });

    compiled
}

fn render_select(builder: &mut SqlBuilder, select: &Select) -> Result<(), InternalError> {
    match select {
        Select::Class(select) => {
            builder
                .push("SELECT FROM ")
                .identifier("class", &select.class)?;
            if let Some(condition) = &select.condition {
                builder.push(" WHERE ");
                render_condition(builder, condition)?;
            }
            render_bounds(builder, &select.bounds)
        }
        Select::RecordIds(select) => {
            let ids = select.ids.iter().copied().map(Value::Id).collect();
            builder.push("SELECT FROM ").bind("ids", Value::List(ids));
            render_bounds(builder, &select.bounds)
        }
        Select::Links(select) => {
            builder
                .push("SELECT expand(")
                .push(select.direction.function())
                .push("('")
                .identifier("link", &select.link)?
                .push("')) FROM (");
            render_select(builder, &select.source)?;
            builder.push(")");
            render_bounds(builder, &select.bounds)
        }
        Select::Binary(select) => render_binary(builder, select),
        Select::Distinct(select) => {
            builder.push("SELECT DISTINCT * FROM (");
            render_select(builder, &select.inner)?;
            builder.push(")");
            render_bounds(builder, &select.bounds)
        }
        Select::Sub(select) => {
            builder.push("SELECT FROM (");
            render_select(builder, &select.inner)?;
            builder.push(")");
            render_bounds(builder, &select.bounds)
        }
    }
}

fn render_binary(
    builder: &mut SqlBuilder,
    select: &BinaryOperationSelect,
) -> Result<(), InternalError> {
    for operand in [&select.left, &select.right] {
        if operand.is_bounded() {
            return Err(InternalError::bounded_subquery(
                select.op.label(),
                operand.describe(),
            ));
        }
    }

    let n = builder.next_composition();
    let (a, b) = (format!("$a{n}"), format!("$b{n}"));
    let ordered = select
        .bounds
        .order
        .as_ref()
        .filter(|order| !order.is_empty());

    match ordered {
        None => {
            let call = op_call(select.op, &a, &b, ", ");
            builder.push(&format!("SELECT expand({call}) LET {a}=("));
        }
        Some(_) => {
            builder.push(&format!("SELECT expand($ordered{n}) LET {a}=("));
        }
    }
    render_select(builder, &select.left)?;
    builder.push(&format!("), {b}=("));
    render_select(builder, &select.right)?;
    builder.push(")");

    if let Some(order) = ordered {
        let call = op_call(select.op, &a, &b, ",");
        builder.push(&format!(
            ", $opResult{n}={call}, $ordered{n}=(SELECT FROM $opResult{n}"
        ));
        render_order(builder, order)?;
        builder.push(")");
    }

    render_window(builder, &select.bounds);

    Ok(())
}

fn op_call(op: SetOperation, a: &str, b: &str, separator: &str) -> String {
    match op {
        SetOperation::Intersect => format!("intersect({a}{separator}{b})"),
        SetOperation::Union { as_set: true } => format!("unionall({a}{separator}{b}).asSet()"),
        SetOperation::Union { as_set: false } => format!("unionall({a}{separator}{b})"),
        SetOperation::Difference => format!("difference({a}{separator}{b})"),
    }
}

fn render_bounds(builder: &mut SqlBuilder, bounds: &SelectBounds) -> Result<(), InternalError> {
    if let Some(order) = &bounds.order {
        render_order(builder, order)?;
    }
    render_window(builder, bounds);

    Ok(())
}

fn render_order(builder: &mut SqlBuilder, order: &Order) -> Result<(), InternalError> {
    for (i, entry) in order.fields().iter().enumerate() {
        builder.push(if i == 0 { " ORDER BY " } else { ", " });
        builder.identifier("order field", &entry.field)?.push(match entry.direction {
            Direction::Asc => " ASC",
            Direction::Desc => " DESC",
        });
    }

    Ok(())
}

fn render_window(builder: &mut SqlBuilder, bounds: &SelectBounds) {
    if let Some(skip) = bounds.skip {
        builder.push(&format!(" SKIP {skip}"));
    }
    if let Some(limit) = bounds.limit {
        builder.push(&format!(" LIMIT {limit}"));
    }
}

fn render_condition(builder: &mut SqlBuilder, condition: &Condition) -> Result<(), InternalError> {
    match condition {
        Condition::Equals { field, value } => {
            builder
                .identifier("field", field)?
                .push(" = ")
                .bind(param_label(field), value.clone());
        }
        Condition::Contains { field, value } => {
            builder
                .identifier("field", field)?
                .push(" CONTAINSTEXT ")
                .bind(param_label(field), Value::from(value.as_str()));
        }
        Condition::StartsWith { field, prefix } => {
            builder
                .identifier("field", field)?
                .push(" LIKE ")
                .bind(param_label(field), Value::from(like_prefix(prefix)));
        }
        Condition::IsNull { field } => {
            builder.identifier("field", field)?.push(" IS NULL");
        }
        Condition::IsNotNull { field } => {
            builder.identifier("field", field)?.push(" IS NOT NULL");
        }
        Condition::EdgeExists { link } => {
            builder
                .push("out('")
                .identifier("link", link)?
                .push("').size() > 0");
        }
        Condition::Range { field, from, to } => {
            let label = param_label(field);
            builder
                .identifier("field", field)?
                .push(" BETWEEN ")
                .bind(label, from.clone())
                .push(" AND ")
                .bind(label, to.clone());
        }
        Condition::InstanceOf { class } => {
            builder
                .push("@this INSTANCEOF ")
                .bind("class", Value::from(class.as_str()));
        }
        Condition::And(left, right) => render_infix(builder, left, " AND ", right)?,
        Condition::Or(left, right) => render_infix(builder, left, " OR ", right)?,
        Condition::Not(inner) => {
            builder.push("NOT (");
            render_condition(builder, inner)?;
            builder.push(")");
        }
        Condition::AndNot(left, right) => {
            builder.push("(");
            render_condition(builder, left)?;
            builder.push(" AND NOT (");
            render_condition(builder, right)?;
            builder.push("))");
        }
    }

    Ok(())
}

fn render_infix(
    builder: &mut SqlBuilder,
    left: &Condition,
    keyword: &str,
    right: &Condition,
) -> Result<(), InternalError> {
    builder.push("(");
    render_condition(builder, left)?;
    builder.push(keyword);
    render_condition(builder, right)?;
    builder.push(")");

    Ok(())
}

// LIKE pattern matching values that start with `prefix` literally.
fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for ch in prefix.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');

    pattern
}
