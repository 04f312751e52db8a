use anyhow::Result;
use municipal_budget_projection::*;
use std::collections::{BTreeMap, HashSet};

const EXPENSE_LEDGER: &str = "\
mes,ano,unidade_orcamentaria,fonte_de_recurso,elemento_despesa,orcado,saldo,empenhado,user_id
6,2021,Secretaria Municipal de Saúde,1500,3.1.90.11,0,0,400,tenant-1
12,2021,Secretaria Municipal de Saúde,1500,3.1.90.11,0,0,1000,tenant-1
6,2022,Secretaria Municipal de Saúde,1500,3.1.90.11,0,0,500,tenant-1
12,2022,Secretaria Municipal de Saúde,1500,3.1.90.11,0,0,1100,tenant-1
6,2023,Secretaria Municipal de Saúde,1500,3.1.90.11,0,0,450,tenant-1
12,2023,Secretaria Municipal de Saúde,1500,3.1.90.11,0,0,1000,tenant-1
6,2023,Secretaria Municipal de Educação,1540,3.3.90.30,0,0,300,tenant-1
12,2023,Secretaria Municipal de Educação,1540,3.3.90.30,0,0,600,tenant-1
6,2024,Secretaria Municipal de Saúde,1500,3.1.90.11,2000,1000,480,tenant-1
6,2024,Secretaria Municipal de Educação,1540,3.3.90.30,5000,700,350,tenant-1
6,2024,Secretaria Municipal de Educação,1540,,100,0,0,tenant-1
";

const REVENUE_LEDGER: &str = "\
mes,ano,descricao,fonte_de_recurso,orcado,saldo,receita
3,2022,Imposto sobre Serviços de Qualquer Natureza,1500,0,0,300
12,2022,Imposto sobre Serviços de Qualquer Natureza,1500,0,0,1000
3,2023,Imposto sobre Serviços de Qualquer Natureza,1500,0,0,200
12,2023,Imposto sobre Serviços de Qualquer Natureza,1500,0,0,1000
3,2024,Imposto sobre Serviços de Qualquer Natureza,1500,1200,1000,260
3,2024,Cota-Parte do ICMS,,800,800,100
";

fn read_ledger<T: serde::de::DeserializeOwned>(data: &str) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_reader(data.as_bytes());
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

fn export_projection_csv(table: &ProjectionTable, filename: &str) -> Result<String> {
    let path = std::env::temp_dir().join(filename);
    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record(["category", "actual", "balance", "projection", "percent", "status"])?;
    for row in table.visible_rows() {
        writer.write_record([
            row.category.clone(),
            row.totals.actual.to_string(),
            row.totals.balance.to_string(),
            format!("{:.2}", row.projection.year_end_projection),
            format!("{:.2}", row.projection.executed_percent),
            format!("{:?}", row.projection.status),
        ])?;
    }
    writer.flush()?;
    Ok(std::fs::read_to_string(path)?)
}

#[test]
fn test_expense_dashboard_from_persisted_rows() -> Result<()> {
    let expenses: Vec<ExpenseRecord> = read_ledger(EXPENSE_LEDGER)?;
    assert_eq!(expenses.len(), 11);
    assert_eq!(expenses[0].user_id.as_deref(), Some("tenant-1"));
    assert_eq!(expenses[10].expense_element, None);

    let processor = BudgetProcessor::new(DashboardConfig::default())?;
    let period = ReportingPeriod::new(6, 2024)?;
    let dashboard = processor.build_dashboard(&expenses, &[], period);

    let units: Vec<&str> = dashboard
        .expenses_by_unit
        .rows
        .iter()
        .map(|r| r.category.as_str())
        .collect();
    assert_eq!(units, vec!["Educação", "Saúde"]);
    assert_eq!(dashboard.expenses_by_unit.total.budgeted, 7100);

    // Pessoal: ranks 0..2 are 2023, 2022, 2021.
    let ratio = (0.45 * 0.40 + (500.0 / 1100.0) * 0.25 + 0.40 * 0.20) / 0.85;
    let pessoal = dashboard
        .expense_projection
        .rows
        .iter()
        .find(|r| r.category == "Pessoal")
        .expect("Pessoal row");
    assert!((pessoal.projection.year_end_projection - 480.0 / ratio).abs() < 1e-6);

    let custeio = dashboard
        .expense_projection
        .rows
        .iter()
        .find(|r| r.category == "Custeio")
        .expect("Custeio row");
    assert!((custeio.projection.year_end_projection - 700.0).abs() < 1e-9);
    assert!((custeio.projection.executed_percent - 100.0).abs() < 1e-9);
    assert_eq!(custeio.projection.status, ExecutionStatus::Adequate);

    // The row without an element has no projection and stays hidden.
    assert_eq!(dashboard.expense_projection.rows.len(), 3);
    assert_eq!(dashboard.expense_projection.visible_rows().count(), 2);

    let summary = &dashboard.expense_projection.summary;
    let projected = 480.0 / ratio + 700.0;
    assert!((summary.projected - projected).abs() < 1e-6);
    assert_eq!(summary.balance, 1700);
    assert!((summary.executed_percent - projected / 1700.0 * 100.0).abs() < 1e-6);

    let csv = export_projection_csv(&dashboard.expense_projection, "expense_projection.csv")?;
    assert!(csv.starts_with("category,actual,balance,projection,percent,status"));
    assert!(csv.contains("Custeio,350,700,700.00,100.00"));

    Ok(())
}

#[test]
fn test_pooled_total_is_not_sum_of_rows() -> Result<()> {
    let expenses: Vec<ExpenseRecord> = read_ledger(EXPENSE_LEDGER)?;
    let period = ReportingPeriod::new(6, 2024)?;
    let config = DashboardConfig::default();
    let dashboard = DashboardBuilder::new(&config).build(&expenses, &[], period);

    let total = dashboard.expense_projection.total;
    let summed: f64 = dashboard
        .expense_projection
        .rows
        .iter()
        .map(|r| r.projection.year_end_projection)
        .sum();
    assert!(total.year_end_projection > 0.0);
    assert!((total.year_end_projection - summed).abs() > 1.0);
    Ok(())
}

#[test]
fn test_revenue_dashboard_from_persisted_rows() -> Result<()> {
    let revenues: Vec<RevenueRecord> = read_ledger(REVENUE_LEDGER)?;
    let period = ReportingPeriod::new(3, 2024)?;
    let config = DashboardConfig::default();
    let dashboard = DashboardBuilder::new(&config).build(&[], &revenues, period);

    let descriptions: Vec<&str> = dashboard
        .revenues_by_description
        .rows
        .iter()
        .map(|r| r.category.as_str())
        .collect();
    assert_eq!(descriptions, vec!["Impostos", "Transferências do Estado"]);

    let table = &dashboard.revenue_projection;
    let livres = table
        .rows
        .iter()
        .find(|r| r.category == "Recursos Livres")
        .expect("Recursos Livres row");
    let ratio = (0.2 * 0.5 + 0.3 * 0.3) / 0.8;
    assert!((livres.projection.year_end_projection - 260.0 / ratio).abs() < 1e-6);

    assert!(table.rows.iter().any(|r| r.category == UNCLASSIFIED_SOURCE));
    let mean = (livres.projection.executed_percent + 0.0) / 2.0;
    assert!((table.summary.executed_percent - mean).abs() < 1e-9);
    Ok(())
}

#[test]
fn test_history_invariants_on_ledger() -> Result<()> {
    let expenses: Vec<ExpenseRecord> = read_ledger(EXPENSE_LEDGER)?;
    let history = build_expense_history(&expenses, 2023, &CategoryTables::default());

    assert!(history.iter().all(|p| p.year <= 2023));

    let mut counts: BTreeMap<(String, i32), HashSet<u32>> = BTreeMap::new();
    for point in &history {
        counts
            .entry((point.category.clone(), point.year))
            .or_default()
            .insert(point.month);
    }
    for ((category, year), months) in &counts {
        assert_eq!(months.len(), 12, "{} {} is not dense", category, year);
    }
    assert_eq!(history.len(), counts.len() * 12);
    Ok(())
}

#[test]
fn test_legacy_sheet_round_trips_through_persisted_json() -> Result<()> {
    let t = Cell::text;
    let mut header = vec![Cell::Empty; 16];
    for (idx, label) in [
        (0, "Órgão"),
        (2, "Unidade"),
        (4, "Ação"),
        (7, "Fonte Recurso"),
        (8, "Elemento Despesa"),
        (9, "Orçado"),
        (13, "Saldo"),
        (15, "Empenhado Até o Mês"),
    ] {
        header[idx] = t(label);
    }
    let mut detail = vec![Cell::Empty; 16];
    detail[7] = t("1500");
    detail[8] = t("3.1.90.11");
    detail[9] = t("1.234,56");
    detail[13] = t("(500)");
    detail[15] = Cell::Number(99.5);

    let grid = SheetGrid::new(vec![
        vec![t("Execução Orçamentária"); 16],
        header,
        vec![Cell::Empty, Cell::Empty, t("Unidade: Fundo Municipal de Saúde")],
        detail,
    ]);

    let rows = extract_table(&grid, 6, 2024, TableKind::Expense)?;
    assert_eq!(rows.len(), 1);

    let tagged = rows[0].clone().with_user_id("tenant-9");
    let json = serde_json::to_value(&tagged)?;
    assert_eq!(json["kind"], "expense");
    assert_eq!(json["unidade_orcamentaria"], "Fundo Municipal de Saúde");
    assert_eq!(json["orcado"], 1235);
    assert_eq!(json["saldo"], -500);
    assert_eq!(json["empenhado"], 100);
    assert_eq!(json["user_id"], "tenant-9");

    let back: LedgerRow = serde_json::from_value(json)?;
    assert_eq!(back.kind(), TableKind::Expense);
    Ok(())
}

#[test]
fn test_config_file_overrides_weights() -> Result<()> {
    let path = std::env::temp_dir().join("municipal_budget_dashboard_config.json");
    std::fs::write(
        &path,
        r#"{"expense_weights": [1.0], "band": {"lower": 90.0, "upper": 110.0}}"#,
    )?;
    let config = DashboardConfig::from_path(&path)?;
    assert_eq!(config.expense_weights.ranks(), 1);
    assert_eq!(config.revenue_weights, WeightTable::revenue_default());

    let expenses: Vec<ExpenseRecord> = read_ledger(EXPENSE_LEDGER)?;
    let dashboard = BudgetProcessor::new(config)?.build_dashboard(
        &expenses,
        &[],
        ReportingPeriod::new(6, 2024)?,
    );
    let pessoal = dashboard
        .expense_projection
        .rows
        .iter()
        .find(|r| r.category == "Pessoal")
        .expect("Pessoal row");
    // Only 2023 is weighted: 480 / 0.45.
    assert!((pessoal.projection.year_end_projection - 480.0 / 0.45).abs() < 1e-6);
    Ok(())
}

#[test]
fn test_schema_generation() {
    let schema = LedgerRow::schema_as_json().unwrap();
    assert!(schema.contains("unidade_orcamentaria"));
    assert!(schema.contains("descricao"));
}
