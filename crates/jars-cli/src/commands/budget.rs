//! Local report commands over the data file

use anyhow::{Context, Result};
use jars_core::{
    allocate_income, compute_budget, compute_month_budget, goal_progress,
    progress_from_transactions, BudgetReport, ClassificationSource, Classifier, GoalProgress,
    JarSettings, Store, YearMonth,
};

use super::format_amount;

pub fn cmd_classify(settings: &JarSettings, description: &str) -> Result<()> {
    let classifier = Classifier::from_settings(settings);
    let result = classifier.explain(description);

    println!();
    println!("🫙 {} ({})", result.jar, result.jar.name());
    match (result.source, &result.matched_keyword) {
        (ClassificationSource::Keyword, Some(keyword)) => {
            println!("   Matched keyword: \"{}\"", keyword)
        }
        _ => println!("   No keyword matched; fallback applied"),
    }

    Ok(())
}

/// Budget report over the stored transactions, using stored jar percents
pub fn budget_report(
    store: &Store,
    settings: &JarSettings,
    month: Option<&str>,
) -> Result<BudgetReport> {
    let month: Option<YearMonth> = month
        .map(|m| {
            m.parse::<YearMonth>()
                .map_err(anyhow::Error::msg)
                .context("Invalid --month (use YYYY-MM)")
        })
        .transpose()?;

    let db = store.snapshot()?;
    let settings = settings.clone().with_jars(&db.jars);
    let classifier = Classifier::from_settings(&settings);

    Ok(match month {
        Some(month) => compute_month_budget(&db.transactions, month, &settings, &classifier),
        None => compute_budget(&db.transactions, &settings, &classifier),
    })
}

pub fn cmd_budget(store: &Store, settings: &JarSettings, month: Option<&str>, json: bool) -> Result<()> {
    let report = budget_report(store, settings, month)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    match report.month {
        Some(month) => println!("📊 Jar budget for {}", month),
        None => println!("📊 Jar budget (all transactions)"),
    }
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   {:<5} {:>14} {:>8} {:>7} {:>14} {:>14}",
        "Jar", "Spent", "Actual", "Set", "Allowed", "Exceeded"
    );
    for jar in &report.jars {
        let marker = if jar.is_exceeded() { "⚠️ " } else { "" };
        println!(
            "   {:<5} {:>14} {:>7}% {:>6}% {:>14} {:>14} {}",
            jar.jar.as_str(),
            format_amount(jar.spent),
            jar.actual_percent,
            jar.set_percent,
            format_amount(jar.allowed),
            format_amount(jar.exceeded),
            marker
        );
    }
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Total expense: {}", format_amount(report.total_expense));
    println!("   Total income:  {}", format_amount(report.total_income));
    println!("   Balance:       {}", format_amount(report.balance));

    if !report.percent_balanced {
        println!();
        println!(
            "   ⚠️  Jar percents sum to {}% instead of 100%",
            report.percent_total
        );
    }

    Ok(())
}

pub fn cmd_allocate(settings: &JarSettings, income: f64) -> Result<()> {
    if !income.is_finite() || income < 0.0 {
        anyhow::bail!("Income must be a non-negative number");
    }

    println!();
    println!("💰 Splitting {} across the jars", format_amount(income));
    println!("   ─────────────────────────────────────────────────────────────");
    for allocation in allocate_income(income, settings) {
        println!(
            "   {:<5} {:<20} {:>6}% {:>14}",
            allocation.jar.as_str(),
            allocation.jar.name(),
            allocation.percent,
            format_amount(allocation.amount)
        );
    }
    if !settings.is_balanced() {
        println!();
        println!(
            "   ⚠️  Jar percents sum to {}% instead of 100%",
            settings.total_percent()
        );
    }

    Ok(())
}

/// Progress for each goal, with an ETA from savings deposits when there are any
pub fn goals_report(store: &Store) -> Result<Vec<GoalProgress>> {
    let db = store.snapshot()?;
    Ok(db
        .goals
        .iter()
        .map(|goal| {
            let mut progress = goal_progress(goal);
            progress.eta_months = progress_from_transactions(goal, &db.transactions).eta_months;
            progress
        })
        .collect())
}

pub fn cmd_goals(store: &Store, json: bool) -> Result<()> {
    let goals = goals_report(store)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&goals)?);
        return Ok(());
    }

    if goals.is_empty() {
        println!("No goals found.");
        return Ok(());
    }

    println!();
    println!("🎯 Goals");
    println!("   ─────────────────────────────────────────────────────────────");
    for goal in &goals {
        let done = if goal.is_complete() { " ✅" } else { "" };
        println!(
            "   {} - {}% ({} / {}){}",
            goal.name,
            goal.percent,
            format_amount(goal.saved),
            format_amount(goal.target),
            done
        );
        if let Some(eta) = goal.eta_months.filter(|_| !goal.is_complete()) {
            println!("      ~{} month(s) to go at the current saving rate", eta);
        }
    }

    Ok(())
}
