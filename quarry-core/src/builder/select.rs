//! SELECT, JOIN and set-operation verbs

use super::common::{IntoJoinOn, IntoJoinType, JoinOn, JoinType, JoinTypeSpec};
use super::prepare::{prepare_field_list, FieldRef, IntoFields, IntoTable, TableRef};
use super::statement::{SetOperator, StatementKind};
use super::QueryBuilder;
use crate::executor::ConnectionPool;
use crate::{Error, Result};

impl<'a, P: ConnectionPool> QueryBuilder<'a, P> {
    /// Start a SELECT, or add the next section of a compound statement when a
    /// set operator is waiting for one. With an error recorded there is no
    /// section to add to, so the builder starts over.
    ///
    /// A computed table expression with `*` fields selects the expression
    /// itself: `select("1+5 as 'res'", "*")` gives `SELECT 1+5 as 'res'`.
    pub fn select(&mut self, table: impl IntoTable, fields: impl IntoFields) -> &mut Self {
        self.select_section(table.into_table(), fields.into_fields(), false, "QueryBuilder::select")
    }

    /// `SELECT DISTINCT`
    pub fn select_distinct(&mut self, table: impl IntoTable, fields: impl IntoFields) -> &mut Self {
        self.select_section(
            table.into_table(),
            fields.into_fields(),
            true,
            "QueryBuilder::select_distinct",
        )
    }

    fn select_section(
        &mut self,
        table: TableRef,
        fields: Vec<FieldRef>,
        distinct: bool,
        context: &'static str,
    ) -> &mut Self {
        if self.statement.pending().is_some() && self.error.is_none() {
            return self.apply(|qb| {
                let (sql, remembered) = render_select(&table, &fields, distinct, context)?;
                qb.statement.push_section(sql);
                qb.last_fields = remembered;
                Ok(())
            });
        }
        match render_select(&table, &fields, distinct, context) {
            Ok((sql, remembered)) => {
                self.reset();
                self.statement.start(StatementKind::Select, sql);
                self.last_fields = remembered;
            }
            Err(err) => self.record_error(err),
        }
        self
    }

    /// Add a JOIN clause after checking the join type against the dialect
    pub fn join(
        &mut self,
        table: impl IntoTable,
        on: impl IntoJoinOn,
        join_type: impl IntoJoinType,
    ) -> &mut Self {
        let table = table.into_table();
        let on = on.into_join_on();
        let join_type = join_type.into_join_type();
        self.apply_clause("QueryBuilder::join", |qb| {
            if table.is_empty() {
                return Err(Error::empty_input("table", "QueryBuilder::join"));
            }
            let join_type = qb.resolve_join_type(join_type)?;
            let mut sql = format!(" {} JOIN {}", join_type, table.render()?);
            match on {
                JoinOn::None => {}
                JoinOn::Columns(left, right) => {
                    let left = FieldRef::parse(&left).render()?;
                    let right = FieldRef::parse(&right).render()?;
                    sql.push_str(&format!(" ON {left} = {right}"));
                }
                JoinOn::Raw(expression) => sql.push_str(&format!(" ON {}", expression.trim())),
            }
            qb.statement.append(&sql);
            Ok(())
        })
    }

    fn resolve_join_type(&self, spec: JoinTypeSpec) -> Result<JoinType> {
        match spec {
            JoinTypeSpec::Known(join_type) => {
                self.dialect().check_join(join_type)?;
                Ok(join_type)
            }
            JoinTypeSpec::Unknown(token) if token.is_empty() => {
                Err(Error::empty_input("join_type", "QueryBuilder::join"))
            }
            JoinTypeSpec::Unknown(token) => Err(self.dialect().illegal_join(&token)),
        }
    }

    pub fn inner_join(&mut self, table: impl IntoTable, on: impl IntoJoinOn) -> &mut Self {
        self.join(table, on, JoinType::Inner)
    }

    pub fn left_join(&mut self, table: impl IntoTable, on: impl IntoJoinOn) -> &mut Self {
        self.join(table, on, JoinType::Left)
    }

    pub fn cross_join(&mut self, table: impl IntoTable) -> &mut Self {
        self.join(table, (), JoinType::Cross)
    }

    /// Wait for the next `select` to be joined with `UNION [ALL]`
    pub fn union(&mut self, all: bool) -> &mut Self {
        let operator = if all {
            SetOperator::UnionAll
        } else {
            SetOperator::Union
        };
        self.set_operation(operator, "QueryBuilder::union")
    }

    pub fn union_all(&mut self) -> &mut Self {
        self.set_operation(SetOperator::UnionAll, "QueryBuilder::union_all")
    }

    /// Wait for the next `select` to be joined with `EXCEPT`
    pub fn excepts(&mut self) -> &mut Self {
        self.set_operation(SetOperator::Except, "QueryBuilder::excepts")
    }

    /// Wait for the next `select` to be joined with `INTERSECT`
    pub fn intersect(&mut self) -> &mut Self {
        self.set_operation(SetOperator::Intersect, "QueryBuilder::intersect")
    }

    /// `UNION [ALL] SELECT <previous fields> FROM table`
    pub fn union_select(&mut self, table: impl IntoTable, all: bool) -> &mut Self {
        let operator = if all {
            SetOperator::UnionAll
        } else {
            SetOperator::Union
        };
        self.select_with_previous_fields(table.into_table(), operator, "QueryBuilder::union_select")
    }

    pub fn union_select_all(&mut self, table: impl IntoTable) -> &mut Self {
        self.select_with_previous_fields(
            table.into_table(),
            SetOperator::UnionAll,
            "QueryBuilder::union_select_all",
        )
    }

    /// `EXCEPT SELECT <previous fields> FROM table`; a statement holds at most
    /// one EXCEPT
    pub fn except_select(&mut self, table: impl IntoTable) -> &mut Self {
        self.select_with_previous_fields(
            table.into_table(),
            SetOperator::Except,
            "QueryBuilder::except_select",
        )
    }

    /// `INTERSECT SELECT <previous fields> FROM table`; a statement holds at
    /// most one INTERSECT
    pub fn intersect_select(&mut self, table: impl IntoTable) -> &mut Self {
        self.select_with_previous_fields(
            table.into_table(),
            SetOperator::Intersect,
            "QueryBuilder::intersect_select",
        )
    }

    fn set_operation(&mut self, operator: SetOperator, context: &'static str) -> &mut Self {
        self.apply(|qb| {
            if qb.statement.kind() != StatementKind::Select || qb.statement.pending().is_some() {
                return Err(Error::missing_select(context));
            }
            qb.statement.begin_compound(operator);
            Ok(())
        })
    }

    fn select_with_previous_fields(
        &mut self,
        table: TableRef,
        operator: SetOperator,
        context: &'static str,
    ) -> &mut Self {
        self.apply(|qb| {
            if table.is_empty() {
                return Err(Error::empty_input("table", context));
            }
            if qb.statement.kind() != StatementKind::Select {
                return Err(Error::missing_select(context));
            }
            let single = matches!(operator, SetOperator::Except | SetOperator::Intersect);
            if single && qb.statement.contains_set_operator(operator) {
                return Err(Error::DuplicateSetOp {
                    operator: operator.as_str(),
                });
            }
            if qb.statement.pending().is_some() {
                return Err(Error::missing_select(context));
            }
            let fields = if qb.last_fields.is_empty() {
                vec![FieldRef::Star]
            } else {
                qb.last_fields.clone()
            };
            let sql = format!(
                "SELECT {} FROM {}",
                prepare_field_list(&fields)?,
                table.render()?
            );
            qb.statement.begin_compound(operator);
            qb.statement.push_section(sql);
            Ok(())
        })
    }
}

/// Render one SELECT section and the field list later sections repeat
fn render_select(
    table: &TableRef,
    fields: &[FieldRef],
    distinct: bool,
    context: &'static str,
) -> Result<(String, Vec<FieldRef>)> {
    if table.is_empty() || fields.is_empty() {
        return Err(Error::empty_input("table or fields", context));
    }
    let mut sql = String::from("SELECT ");
    if distinct {
        sql.push_str("DISTINCT ");
    }
    if table.is_expression() && matches!(fields, [FieldRef::Star]) {
        let expression = table.render()?;
        sql.push_str(&expression);
        return Ok((sql, vec![FieldRef::parse(&expression)]));
    }
    sql.push_str(&format!(
        "{} FROM {}",
        prepare_field_list(fields)?,
        table.render()?
    ));
    Ok((sql, fields.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::condition::Conditions;
    use crate::builder::tests::MockPool;
    use crate::Value;

    #[test]
    fn test_simple_select() {
        let pool = MockPool::sqlite();
        let mut qb = QueryBuilder::new(&pool);
        qb.select("users", "*");
        assert_eq!(qb.to_sql(false), "SELECT * FROM `users`");
        qb.select("users", "id, email, username");
        assert_eq!(qb.to_sql(false), "SELECT `id`, `email`, `username` FROM `users`");
    }

    #[test]
    fn test_select_distinct() {
        let pool = MockPool::sqlite();
        let mut qb = QueryBuilder::new(&pool);
        qb.select_distinct("customers", "city");
        assert_eq!(qb.to_sql(false), "SELECT DISTINCT `city` FROM `customers`");
        qb.select_distinct("", "city");
        assert_eq!(
            qb.error_message(),
            "Empty table or fields in QueryBuilder::select_distinct"
        );
    }

    #[test]
    fn test_select_count_expression() {
        let pool = MockPool::sqlite();
        let mut qb = QueryBuilder::new(&pool);
        qb.select("users", "COUNT(*) as counter");
        assert_eq!(qb.to_sql(false), "SELECT COUNT(*) AS `counter` FROM `users`");
    }

    #[test]
    fn test_select_expression_without_table() {
        let pool = MockPool::sqlite();
        let mut qb = QueryBuilder::new(&pool);
        qb.select("1+5 as 'res'", "*");
        assert!(!qb.has_error());
        assert_eq!(qb.to_sql(false), "SELECT 1+5 as 'res'");
    }

    #[test]
    fn test_select_from_subquery() {
        let pool = MockPool::sqlite();
        let mut qb = QueryBuilder::new(&pool);
        qb.select(TableRef::subquery("SELECT id FROM users").as_alias("u"), "u.id");
        assert_eq!(qb.to_sql(false), "SELECT `u`.`id` FROM (SELECT id FROM users) AS `u`");
        assert!(!qb.is_compound());
    }

    #[test]
    fn test_select_with_aliases() {
        let pool = MockPool::sqlite();
        let mut qb = QueryBuilder::new(&pool);
        qb.select(("b", "branches"), ["b.id", "b.name"])
            .where_(Conditions::new().push(("b.id", ">", 1)).and(("b.parent_id", 1)))
            .order_by("b.id desc");
        assert_eq!(
            qb.to_sql(false),
            "SELECT `b`.`id`, `b`.`name` FROM `branches` AS `b` WHERE (`b`.`id` > ?) AND (`b`.`parent_id` = ?) ORDER BY `b`.`id` DESC"
        );
        assert_eq!(qb.parameters(), &[Value::I32(1), Value::I32(1)]);
    }

    #[test]
    fn test_empty_select_arguments() {
        let pool = MockPool::sqlite();
        let mut qb = QueryBuilder::new(&pool);
        qb.select("users", "");
        assert!(qb.has_error());
        assert_eq!(qb.error_message(), "Empty table or fields in QueryBuilder::select");
    }

    #[test]
    fn test_inner_join_with_column_pair() {
        let pool = MockPool::sqlite();
        let mut qb = QueryBuilder::new(&pool);
        qb.select(
            ("u", "users"),
            vec![
                FieldRef::parse("u.id"),
                FieldRef::parse("u.email"),
                FieldRef::parse("u.username"),
                FieldRef::parse("groups.permissions").as_alias("perms"),
            ],
        )
        .join("groups", ("u.group_id", "groups.id"), "inner");
        assert!(!qb.has_error());
        assert_eq!(
            qb.to_sql(false),
            "SELECT `u`.`id`, `u`.`email`, `u`.`username`, `groups`.`permissions` AS `perms` FROM `users` AS `u` INNER JOIN `groups` ON `u`.`group_id` = `groups`.`id`"
        );
        assert!(qb.parameters().is_empty());
    }

    #[test]
    fn test_multiple_joins_and_mixed_conditions() {
        let pool = MockPool::sqlite();
        let mut qb = QueryBuilder::new(&pool);
        qb.select(("cp", "cabs_printers"), "cp.id, cb.name as cab_name")
            .inner_join(("cb", "cabs"), ("cp.cab_id", "cb.id"))
            .inner_join(("c", "cartridge_types"), "p.cartridge_id=c.id")
            .where_(
                Conditions::new()
                    .push(("cp.cab_id", "in", [11, 12, 13]))
                    .or(("cp.cab_id", 5))
                    .and(("p.id", ">", crate::col("c.id"))),
            );
        assert!(!qb.has_error());
        assert_eq!(
            qb.to_sql(true),
            "SELECT `cp`.`id`, `cb`.`name` AS `cab_name` FROM `cabs_printers` AS `cp` \
             INNER JOIN `cabs` AS `cb` ON `cp`.`cab_id` = `cb`.`id` \
             INNER JOIN `cartridge_types` AS `c` ON p.cartridge_id=c.id \
             WHERE (`cp`.`cab_id` IN (11,12,13)) OR (`cp`.`cab_id` = 5) AND (`p`.`id` > `c`.`id`)"
        );
        assert_eq!(qb.parameters().len(), 4);
    }

    #[test]
    fn test_left_and_cross_joins() {
        let pool = MockPool::sqlite();
        let mut qb = QueryBuilder::new(&pool);
        qb.select("employees", "employees.employee_id")
            .join("positions", ("employees.position_id", "positions.position_id"), "left");
        assert_eq!(
            qb.to_sql(false),
            "SELECT `employees`.`employee_id` FROM `employees` LEFT JOIN `positions` ON `employees`.`position_id` = `positions`.`position_id`"
        );

        qb.select(("e", "employees"), "e.employee_id")
            .join(("p", "positions"), ("e.position_id", "p.position_id"), "left outer");
        assert_eq!(
            qb.to_sql(false),
            "SELECT `e`.`employee_id` FROM `employees` AS `e` LEFT OUTER JOIN `positions` AS `p` ON `e`.`position_id` = `p`.`position_id`"
        );

        qb.select("positions", "*").cross_join("departments");
        assert_eq!(qb.to_sql(false), "SELECT * FROM `positions` CROSS JOIN `departments`");
    }

    #[test]
    fn test_join_validation() {
        let pool = MockPool::sqlite();
        let mut qb = QueryBuilder::new(&pool);
        qb.select("users", "*").join("", (), "inner");
        assert_eq!(qb.error_message(), "Empty table in QueryBuilder::join");

        qb.select("users", "*").join("clients", (), "");
        assert_eq!(qb.error_message(), "Empty join_type in QueryBuilder::join");

        qb.select("users", "*").join("clients", (), "asdasd");
        assert_eq!(qb.error_message(), "ASDASD JOIN is not allowed in SQLite");
    }

    #[test]
    fn test_full_join_depends_on_dialect() {
        let sqlite = MockPool::sqlite();
        let mut qb = QueryBuilder::new(&sqlite);
        qb.select("users", "*").join("clients", (), "full");
        assert!(qb.has_error());
        assert!(matches!(qb.error(), Some(Error::IllegalJoinType { .. })));
        assert_eq!(qb.to_sql(false), "SELECT * FROM `users`");

        let mysql = MockPool::mysql();
        let mut qb = QueryBuilder::new(&mysql);
        qb.select("users", "*").join("clients", (), "full");
        assert!(!qb.has_error());
        assert_eq!(qb.to_sql(false), "SELECT * FROM `users` FULL OUTER JOIN `clients`");
    }

    #[test]
    fn test_union_then_select() {
        let pool = MockPool::sqlite();
        let mut qb = QueryBuilder::new(&pool);
        qb.select("clients", "name, age, account_sum + account_sum * 0.1 AS total_sum")
            .where_(("account_sum", "<", 3000))
            .union(false)
            .select("clients", "name, age, account_sum + account_sum * 0.3 AS total_sum")
            .where_(("account_sum", ">=", 3000));
        assert!(!qb.has_error());
        assert!(qb.is_compound());
        assert_eq!(
            qb.to_sql(true),
            "SELECT `name`, `age`, account_sum + account_sum * 0.1 AS `total_sum` FROM `clients` WHERE (`account_sum` < 3000) \
             UNION SELECT `name`, `age`, account_sum + account_sum * 0.3 AS `total_sum` FROM `clients` WHERE (`account_sum` >= 3000)"
        );
        assert_eq!(qb.parameters(), &[Value::I32(3000), Value::I32(3000)]);
    }

    #[test]
    fn test_union_all_with_trailing_order() {
        let pool = MockPool::sqlite();
        let mut qb = QueryBuilder::new(&pool);
        qb.select("departments", ["department_id", "department_name"])
            .where_(("department_id", ">=", 10))
            .union_all()
            .select("employees", ["employee_id", "last_name"])
            .where_(("last_name", "Rassohin"))
            .order_by("2");
        assert_eq!(
            qb.to_sql(true),
            "SELECT `department_id`, `department_name` FROM `departments` WHERE (`department_id` >= 10) \
             UNION ALL SELECT `employee_id`, `last_name` FROM `employees` WHERE (`last_name` = 'Rassohin') ORDER BY `2` ASC"
        );
    }

    #[test]
    fn test_union_select_repeats_fields() {
        let pool = MockPool::sqlite();
        let mut qb = QueryBuilder::new(&pool);
        qb.select("clients", "name, age")
            .where_(("id", "<", 10))
            .union_select("employees", false)
            .where_(("id", 1));
        assert_eq!(
            qb.to_sql(true),
            "SELECT `name`, `age` FROM `clients` WHERE (`id` < 10) UNION SELECT `name`, `age` FROM `employees` WHERE (`id` = 1)"
        );

        qb.select("cabs", "id, name").union_select_all("printer_models");
        assert_eq!(
            qb.to_sql(false),
            "SELECT `id`, `name` FROM `cabs` UNION ALL SELECT `id`, `name` FROM `printer_models`"
        );

        qb.select("clients", "name").union_select("", false);
        assert_eq!(qb.error_message(), "Empty table in QueryBuilder::union_select");
    }

    #[test]
    fn test_except() {
        let pool = MockPool::sqlite();
        let mut qb = QueryBuilder::new(&pool);
        qb.select("suppliers", "supplier_id, state")
            .where_(("state", "Nevada"))
            .excepts()
            .select("companies", "company_id, state")
            .where_(("company_id", "<", 2000))
            .order_by("1 desc");
        assert_eq!(
            qb.to_sql(true),
            "SELECT `supplier_id`, `state` FROM `suppliers` WHERE (`state` = 'Nevada') \
             EXCEPT SELECT `company_id`, `state` FROM `companies` WHERE (`company_id` < 2000) ORDER BY `1` DESC"
        );

        qb.select("departments", "department_id").except_select("employees");
        assert_eq!(
            qb.to_sql(false),
            "SELECT `department_id` FROM `departments` EXCEPT SELECT `department_id` FROM `employees`"
        );
    }

    #[test]
    fn test_second_except_is_rejected() {
        let pool = MockPool::sqlite();
        let mut qb = QueryBuilder::new(&pool);
        qb.select("clients", "name, age").excepts().except_select("clients");
        assert!(matches!(
            qb.error(),
            Some(Error::DuplicateSetOp { operator: "EXCEPT" })
        ));
        assert_eq!(qb.error_message(), "SQL has already EXCEPT");

        qb.select("clients", "name")
            .except_select("suppliers")
            .except_select("employees");
        assert_eq!(qb.error_message(), "SQL has already EXCEPT");
    }

    #[test]
    fn test_set_operator_needs_select_before_another() {
        let pool = MockPool::sqlite();
        let mut qb = QueryBuilder::new(&pool);
        qb.select("a", "*").union(false).except_select("b");
        assert!(matches!(qb.error(), Some(Error::MissingSelect { .. })));
        assert_eq!(qb.error_message(), "No SELECT found in QueryBuilder::except_select");
        assert_eq!(qb.to_sql(false), "SELECT * FROM `a` UNION");

        qb.select("a", "*").union(false).union(true);
        assert_eq!(qb.error_message(), "No SELECT found in QueryBuilder::union");
        assert_eq!(qb.to_sql(false), "SELECT * FROM `a` UNION");

        qb.select("a", "*").union_all().intersect();
        assert!(matches!(qb.error(), Some(Error::MissingSelect { .. })));
    }

    #[test]
    fn test_select_restarts_after_error_in_compound() {
        let pool = MockPool::sqlite();
        let mut qb = QueryBuilder::new(&pool);
        qb.select("a", "*").union(false).where_(("id", 1));
        assert!(qb.has_error());

        qb.select("users", "*");
        assert!(!qb.has_error());
        assert!(!qb.is_compound());
        assert_eq!(qb.to_sql(false), "SELECT * FROM `users`");
    }

    #[test]
    fn test_intersect() {
        let pool = MockPool::sqlite();
        let mut qb = QueryBuilder::new(&pool);
        qb.select("departments", "department_id")
            .where_(("department_id", ">=", 25))
            .intersect()
            .select("employees", "department_id")
            .where_(("last_name", "<>", "Petrov"));
        assert_eq!(
            qb.to_sql(true),
            "SELECT `department_id` FROM `departments` WHERE (`department_id` >= 25) \
             INTERSECT SELECT `department_id` FROM `employees` WHERE (`last_name` <> 'Petrov')"
        );

        qb.select("departments", "department_id").intersect_select("employees");
        assert_eq!(
            qb.to_sql(false),
            "SELECT `department_id` FROM `departments` INTERSECT SELECT `department_id` FROM `employees`"
        );

        qb.select("clients", "name").intersect().intersect_select("clients");
        assert_eq!(qb.error_message(), "SQL has already INTERSECT");
    }

    #[test]
    fn test_set_operation_requires_select() {
        let pool = MockPool::sqlite();
        let mut qb = QueryBuilder::new(&pool);
        qb.delete("users").union(false);
        assert!(matches!(qb.error(), Some(Error::MissingSelect { .. })));
    }
}
