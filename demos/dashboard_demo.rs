use chrono::Local;
use municipal_budget_projection::{
    default_reporting_period, period_title, BudgetProcessor, DashboardConfig, ExpenseRecord,
    LedgerRow, ProjectionTable, ReportingPeriod, RevenueRecord, TableKind,
};
use std::error::Error;

fn expense(
    year: i32,
    month: u32,
    unit: &str,
    element: &str,
    amounts: (i64, i64, i64),
) -> ExpenseRecord {
    ExpenseRecord {
        month,
        year,
        budget_unit: Some(unit.to_string()),
        resource_source: Some("1500".to_string()),
        expense_element: Some(element.to_string()),
        budgeted: amounts.0,
        balance: amounts.1,
        committed: amounts.2,
        user_id: None,
    }
}

fn revenue(
    year: i32,
    month: u32,
    description: &str,
    source: &str,
    amounts: (i64, i64, i64),
) -> RevenueRecord {
    RevenueRecord {
        month,
        year,
        description: Some(description.to_string()),
        resource_source: Some(source.to_string()),
        budgeted: amounts.0,
        balance: amounts.1,
        collected: amounts.2,
        user_id: None,
    }
}

fn sample_ledgers() -> (Vec<ExpenseRecord>, Vec<RevenueRecord>) {
    let saude = "Secretaria Municipal de Saúde";
    let educacao = "Secretaria Municipal de Educação";
    let iss = "Imposto sobre Serviços de Qualquer Natureza";

    let mut expenses = Vec::new();
    let mut revenues = Vec::new();
    let june_shares = [
        (2019, 0.47),
        (2020, 0.44),
        (2021, 0.46),
        (2022, 0.45),
        (2023, 0.48),
    ];
    for (year, june_share) in june_shares {
        let payroll = 1_000_000 + (year as i64 - 2019) * 50_000;
        let june_payroll = (payroll as f64 * june_share) as i64;
        expenses.push(expense(year, 6, saude, "3.1.90.11", (0, 0, june_payroll)));
        expenses.push(expense(year, 12, saude, "3.1.90.11", (0, 0, payroll)));
        expenses.push(expense(year, 6, educacao, "3.3.90.30", (0, 0, 180_000)));
        expenses.push(expense(year, 12, educacao, "3.3.90.30", (0, 0, 400_000)));

        revenues.push(revenue(year, 6, iss, "1500", (0, 0, 240_000)));
        revenues.push(revenue(year, 12, iss, "1500", (0, 0, 500_000)));
    }

    expenses.push(expense(2024, 6, saude, "3.1.90.11", (1_400_000, 1_300_000, 600_000)));
    expenses.push(expense(2024, 6, educacao, "3.3.90.30", (450_000, 420_000, 200_000)));
    revenues.push(revenue(2024, 6, iss, "1500", (520_000, 520_000, 250_000)));
    revenues.push(revenue(
        2024,
        6,
        "Compensação Financeira",
        "27080000000",
        (80_000, 80_000, 30_000),
    ));

    (expenses, revenues)
}

fn print_table(title: &str, table: &ProjectionTable) {
    println!("\n{}", title);
    println!("{:-<72}", "");
    for row in table.visible_rows() {
        println!(
            "{:<32} actual {:>10} projected {:>12.0} {:>7.2}% {:?}",
            row.category,
            row.totals.actual,
            row.projection.year_end_projection,
            row.projection.executed_percent,
            row.projection.status
        );
    }
    println!(
        "{:<32} summary {:>21.0} {:>7.2}% {:?}",
        "Total",
        table.summary.projected,
        table.summary.executed_percent,
        table.summary.status
    );
    println!(
        "{:<32} pooled {:>22.0} {:>7.2}% {:?}",
        "",
        table.total.year_end_projection,
        table.total.executed_percent,
        table.total.status
    );
}

fn main() -> Result<(), Box<dyn Error>> {
    let processor = BudgetProcessor::new(DashboardConfig::default())?;
    let args: Vec<String> = std::env::args().collect();

    // dashboard_demo <despesas.xlsx> <month> <year> extracts a real workbook.
    if args.len() == 4 {
        let month: u32 = args[2].parse()?;
        let year: i32 = args[3].parse()?;
        let rows = processor.process_workbook(&args[1], month, year, TableKind::Expense)?;
        println!("Extracted {} expense rows from {}", rows.len(), args[1]);
        for row in rows.iter().take(10) {
            println!("{}", serde_json::to_string(row)?);
        }
        let (expenses, _) = LedgerRow::partition(rows);
        let dashboard =
            processor.build_dashboard(&expenses, &[], ReportingPeriod::new(month, year)?);
        print_table("Despesas", &dashboard.expense_projection);
        return Ok(());
    }

    let today = Local::now().date_naive();
    println!(
        "Default reporting period for today: {}",
        period_title(default_reporting_period(today))
    );

    let (expenses, revenues) = sample_ledgers();
    let period = ReportingPeriod::new(6, 2024)?;
    let dashboard = processor.build_dashboard(&expenses, &revenues, period);

    println!("Dashboard {}", period_title(period));
    println!("\nDespesas por unidade");
    for row in &dashboard.expenses_by_unit.rows {
        println!(
            "  {:<30} orçado {:>10} saldo {:>10} empenhado {:>10}",
            row.category, row.totals.budgeted, row.totals.balance, row.totals.actual
        );
    }

    print_table("Projeção de despesas", &dashboard.expense_projection);
    print_table("Projeção de receitas", &dashboard.revenue_projection);

    Ok(())
}
