use analytics::{
    ElasticityEstimate, MonthlyElasticity, PriceOptimization, SalesForecast, SalesTrend,
    Segmentation,
};
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, Color, ContentArrangement, Table};
use core_types::{DashboardMetrics, PromotionSummary, Recommendation};
use dashboard::{Bands, ConfidenceBand, PriorityBand, Trend};
use rust_decimal::Decimal;

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn trend_cell(value: Decimal) -> Cell {
    match Trend::of(value) {
        Trend::Up => Cell::new(format!("▲ {}", value)).fg(Color::Green),
        Trend::Down => Cell::new(format!("▼ {}", value)).fg(Color::Red),
    }
}

/// The four dashboard cards as a two-column table.
pub fn metrics_table(metrics: &DashboardMetrics) -> Table {
    let mut table = new_table(vec!["Metric", "Value"]);
    table.add_row(vec![
        Cell::new("Average elasticity"),
        Cell::new(metrics.avg_elasticity.to_string()),
    ]);
    table.add_row(vec![
        Cell::new("Lost profit"),
        Cell::new(metrics.lost_profit.to_string()).fg(Color::Red),
    ]);
    table.add_row(vec![Cell::new("Potential growth"), trend_cell(metrics.potential_growth)]);
    table.add_row(vec![
        Cell::new("Active promotions"),
        Cell::new(metrics.active_promotions),
    ]);
    table
}

pub fn recommendations_table(recommendations: &[Recommendation], bands: &Bands) -> Table {
    let mut table = new_table(vec![
        "Product",
        "Current price",
        "Recommended price",
        "Potential profit",
        "Confidence",
        "Priority",
    ]);
    for r in recommendations {
        let confidence_color = match bands.confidence(r.confidence) {
            ConfidenceBand::High => Color::Green,
            ConfidenceBand::Medium => Color::Yellow,
            ConfidenceBand::Low => Color::Red,
        };
        let priority_color = match bands.priority(r.priority) {
            PriorityBand::Urgent => Color::Red,
            PriorityBand::Elevated => Color::Yellow,
            PriorityBand::Routine => Color::Green,
        };
        table.add_row(vec![
            Cell::new(&r.product),
            Cell::new(format!("{:.2}", r.current_price)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2}", r.recommended_price)).set_alignment(CellAlignment::Right),
            Cell::new(format!(
                "{:.2} (+{}%)",
                r.potential_profit.absolute,
                r.potential_profit.percentage.round_dp(2)
            ))
            .set_alignment(CellAlignment::Right),
            Cell::new(format!("{}%", r.confidence.round_dp(0))).fg(confidence_color),
            Cell::new(r.priority.round_dp(2)).fg(priority_color),
        ]);
    }
    table
}

pub fn estimates_table(estimates: &[ElasticityEstimate]) -> Table {
    let mut table = new_table(vec![
        "Category",
        "Observations",
        "Elasticity",
        "Class",
        "Current price",
        "Optimum price",
        "Change",
        "Expected quantity",
    ]);
    for e in estimates {
        table.add_row(vec![
            Cell::new(&e.category),
            Cell::new(e.observations),
            Cell::new(format!("{:.2}", e.elasticity)),
            Cell::new(format!("{:?}", e.class)),
            Cell::new(format!("{:.2}", e.record.current_price)),
            Cell::new(format!("{:.2}", e.record.optimum_price)),
            Cell::new(format!("{:+.1}%", e.record.recommended_change)),
            Cell::new(format!(
                "{:.1} ({:+.1}%)",
                e.expected_quantity, e.quantity_change_percent
            )),
        ]);
    }
    table
}

pub fn promotions_table(promotions: &[PromotionSummary]) -> Table {
    let mut table = new_table(vec!["Promotion", "Sales increase", "Average check", "Conversion"]);
    for p in promotions {
        let conversion = p
            .conversion_rate
            .map(|c| format!("{}%", c))
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(&p.name),
            Cell::new(format!("{}%", p.sales_increase)),
            Cell::new(format!("{}%", p.average_check)),
            Cell::new(conversion),
        ]);
    }
    table
}

pub fn segmentation_table(segmentation: &Segmentation) -> Table {
    let mut table = new_table(vec!["Segment", "Categories"]);
    for (name, categories) in [
        ("Low elasticity", &segmentation.low),
        ("Medium elasticity", &segmentation.medium),
        ("High elasticity", &segmentation.high),
    ] {
        table.add_row(vec![name.to_string(), categories.join(", ")]);
    }
    table
}

fn optional_pct(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:+.1}%", v))
        .unwrap_or_else(|| "-".to_string())
}

/// Current against optimized totals over every category.
pub fn optimization_table(optimization: &PriceOptimization) -> Table {
    let mut table = new_table(vec!["Total", "Current", "Optimized", "Change"]);
    table.add_row(vec![
        "Profit".to_string(),
        format!("{:.2}", optimization.current_profit),
        format!("{:.2}", optimization.optimized_profit),
        optional_pct(optimization.expected_profit_increase),
    ]);
    table.add_row(vec![
        "Revenue".to_string(),
        format!("{:.2}", optimization.current_revenue),
        format!("{:.2}", optimization.optimized_revenue),
        optional_pct(optimization.expected_revenue_change),
    ]);
    table
}

pub fn monthly_table(monthly: &[MonthlyElasticity]) -> Table {
    let mut table = new_table(vec!["Month", "Average", "Categories"]);
    for m in monthly {
        let categories: Vec<String> = m
            .elasticities
            .iter()
            .map(|(category, e)| format!("{category} {e:.2}"))
            .collect();
        table.add_row(vec![
            m.month.clone(),
            format!("{:.2}", m.average),
            categories.join(", "),
        ]);
    }
    table
}

pub fn forecasts_table(forecasts: &[SalesForecast]) -> Table {
    let mut table = new_table(vec![
        "Category",
        "Accuracy",
        "Periods",
        "Trend",
        "Price sensitivity",
    ]);
    for f in forecasts {
        let trend = match f.summary.trend {
            SalesTrend::Growth => Cell::new(format!("▲ {:.1}%", f.summary.trend_change_pct))
                .fg(Color::Green),
            SalesTrend::Decline => Cell::new(format!("▼ {:.1}%", f.summary.trend_change_pct))
                .fg(Color::Red),
            SalesTrend::Stable => Cell::new(format!("= {:.1}%", f.summary.trend_change_pct)),
        };
        let sensitivity = Cell::new(format!("{:.2}", f.summary.price_sensitivity));
        let sensitivity = if f.summary.price_sensitive {
            sensitivity.fg(Color::Yellow)
        } else {
            sensitivity
        };
        table.add_row(vec![
            Cell::new(&f.category),
            Cell::new(format!("{:.1}%", f.accuracy)),
            Cell::new(f.points.len()),
            trend,
            sensitivity,
        ]);
    }
    table
}
