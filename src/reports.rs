use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::stats::{Accumulation, Stats};
use crate::utils::format_date;

pub fn report_filename(generated_on: NaiveDate) -> String {
    format!("marksix_stats_{}.html", format_date(generated_on))
}

fn push_table(html: &mut String, title: &str, accumulations: &[Accumulation]) {
    html.push_str(&format!(
        r#"
            <div class="stats-section">
                <div class="section-header">{}</div>
                <table>
                    <tr><th>Number</th><th>Count</th><th>Share</th></tr>
"#,
        title
    ));

    for accumulation in accumulations {
        html.push_str(&format!(
            "                    <tr><td class=\"ball\">{}</td><td>{}</td><td>{:.1}%</td></tr>\n",
            accumulation.number,
            accumulation.count,
            accumulation.percentage * 100.0
        ));
    }

    html.push_str("                </table>\n            </div>\n");
}

pub fn generate_html_report(stats: &Stats, generated_on: NaiveDate) -> String {
    let mut html = String::new();

    html.push_str(&format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Mark Six statistics - {}</title>
    <style>
        body {{
            font-family: Helvetica, Arial, sans-serif;
            margin: 0;
            background: #f4f6f2;
            color: #1f2a1d;
        }}
        main {{
            max-width: 960px;
            margin: 24px auto;
            border: 1px solid #c9d3c3;
            background: #fff;
        }}
        header {{
            background: #1b5e20;
            color: #fff;
            padding: 18px 24px;
        }}
        header h1 {{ margin: 0 0 4px; font-size: 1.5em; }}
        .sections {{
            display: flex;
            flex-wrap: wrap;
            gap: 24px;
            padding: 24px;
        }}
        .stats-section {{ flex: 1 1 260px; }}
        .section-header {{
            border-bottom: 2px solid #1b5e20;
            padding-bottom: 6px;
            margin-bottom: 8px;
            font-weight: bold;
        }}
        table {{ width: 100%; border-collapse: collapse; }}
        th, td {{ padding: 4px 8px; text-align: right; }}
        tr:nth-child(even) td {{ background: #eef3ec; }}
        .ball {{ text-align: center; font-weight: bold; }}
        footer {{
            border-top: 1px solid #c9d3c3;
            padding: 10px 24px;
            font-size: 0.85em;
            color: #5b6b57;
        }}
    </style>
</head>
<body>
    <main>
        <header>
            <h1>Mark Six statistics</h1>
            <div>{} draws on record</div>
        </header>
        <div class="sections">
"#,
        format_date(generated_on),
        stats.total
    ));

    push_table(&mut html, "Drawn numbers", &stats.numbers);
    push_table(&mut html, "Special numbers", &stats.specials);

    let cold = stats
        .numbers_not_in_last_10
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    html.push_str(&format!(
        r#"
            <div class="stats-section">
                <div class="section-header">Not drawn in the last 10 draws</div>
                <p>{}</p>
            </div>
        </div>
        <footer>Generated on {}</footer>
    </main>
</body>
</html>
"#,
        if cold.is_empty() { "-" } else { cold.as_str() },
        format_date(generated_on)
    ));

    html
}

/// Writes the report into `report_dir`, creating it if needed.
pub fn save_html_report(
    html_content: &str,
    report_dir: &Path,
    generated_on: NaiveDate,
) -> Result<PathBuf, StoreError> {
    fs::create_dir_all(report_dir).map_err(|e| StoreError::io(report_dir, e))?;
    let filepath = report_dir.join(report_filename(generated_on));
    fs::write(&filepath, html_content).map_err(|e| StoreError::io(&filepath, e))?;
    Ok(filepath)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats;
    use crate::types::DrawRecord;
    use tempfile::TempDir;

    #[test]
    fn report_lists_numbers_and_cold_numbers() {
        let records = vec![DrawRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            draw_id: "24/001".to_string(),
            numbers: vec![3, 9, 14, 27, 38, 45],
            special: 21,
        }];
        let stats = stats::compute(&records);
        let generated_on = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        let html = generate_html_report(&stats, generated_on);

        assert!(html.contains("1 draws on record"));
        assert!(html.contains("<td class=\"ball\">27</td><td>1</td><td>100.0%</td>"));
        assert!(html.contains("<td class=\"ball\">21</td>"));
        assert!(html.contains("1, 2, 4, 5"));
        assert!(html.contains("Generated on 2024-01-03"));

        let dir = TempDir::new().unwrap();
        let path = save_html_report(&html, &dir.path().join("reports"), generated_on).unwrap();
        assert!(path.ends_with("marksix_stats_2024-01-03.html"));
        assert_eq!(fs::read_to_string(path).unwrap(), html);
    }
}
