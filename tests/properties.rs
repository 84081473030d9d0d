use proptest::prelude::*;
use tabular_processor::{AggregateOp, ColumnType, QueryBuilder, Row, Table, infer_schema};

fn single_column(name: &str, values: &[String]) -> Table {
    Table::new(
        vec![name.to_string()],
        values.iter().map(|v| vec![v.clone()]).collect(),
    )
}

fn ints(values: &[i64]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        rng_seed: proptest::test_runner::RngSeed::Fixed(0),
        failure_persistence: None,
        .. ProptestConfig::default()
    })]

    #[test]
    fn integer_columns_infer_as_integer(values in proptest::collection::vec(any::<i64>(), 1..50)) {
        let table = single_column("v", &ints(&values));
        let schema = infer_schema(&table).unwrap();
        prop_assert_eq!(schema.column_type("v"), Some(ColumnType::Int64));
        prop_assert_eq!(infer_schema(&table).unwrap(), schema);
    }

    #[test]
    fn one_float_value_makes_column_float(
        values in proptest::collection::vec(-10_000i64..10_000, 1..50),
        at in any::<prop::sample::Index>(),
    ) {
        let mut raw = ints(&values);
        let i = at.index(raw.len());
        raw[i] = format!("{}.5", values[i]);
        let schema = infer_schema(&single_column("v", &raw)).unwrap();
        prop_assert_eq!(schema.column_type("v"), Some(ColumnType::Float64));
    }

    #[test]
    fn one_word_makes_column_string(
        values in proptest::collection::vec(any::<i64>(), 1..50),
        at in any::<prop::sample::Index>(),
        word in "[a-z]{1,8}",
    ) {
        let mut raw = ints(&values);
        let i = at.index(raw.len());
        raw[i] = word;
        let schema = infer_schema(&single_column("v", &raw)).unwrap();
        prop_assert_eq!(schema.column_type("v"), Some(ColumnType::Str));
    }

    #[test]
    fn equal_and_not_equal_partition_rows(
        values in proptest::collection::vec(0i64..20, 1..60),
        literal in 0i64..20,
    ) {
        let table = single_column("n", &ints(&values));
        let schema = infer_schema(&table).unwrap();

        let run = |expression: String| {
            QueryBuilder::new()
                .filter(&expression)
                .build(&schema)
                .unwrap()
                .execute(&table)
                .unwrap()
                .rows
        };
        let equal = run(format!("n={}", literal));
        let not_equal = run(format!("n!={}", literal));

        prop_assert!(equal.iter().all(|r| r[0] == literal.to_string()));
        prop_assert!(not_equal.iter().all(|r| r[0] != literal.to_string()));

        let mut union: Vec<Row> = equal.into_iter().chain(not_equal).collect();
        union.sort();
        let mut all = table.rows.clone();
        all.sort();
        prop_assert_eq!(union, all);
    }

    #[test]
    fn count_distinct_of_constant_column_is_one(value in "[a-z0-9]{1,6}", n in 1usize..100) {
        let table = single_column("c", &vec![value; n]);
        let schema = infer_schema(&table).unwrap();
        let result = QueryBuilder::new()
            .aggregate("c", AggregateOp::CountDistinct)
            .aggregate("c", AggregateOp::Count)
            .build(&schema)
            .unwrap()
            .execute(&table)
            .unwrap();
        prop_assert_eq!(result.rows, vec![vec!["1".to_string(), n.to_string()]]);
    }

    #[test]
    fn plain_query_reproduces_table(
        rows in proptest::collection::vec(
            proptest::collection::vec("[A-Za-z0-9 ,\"]{0,6}", 3),
            0..30,
        ),
    ) {
        let table = Table::new(vec!["a".into(), "b".into(), "c".into()], rows);
        let schema = infer_schema(&table).unwrap();
        let result = QueryBuilder::new().build(&schema).unwrap().execute(&table).unwrap();
        prop_assert_eq!(result, table);
    }
}
