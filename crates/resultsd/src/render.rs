//! HTML rendering for the search page.
//!
//! One full document per request. Every interpolated value is escaped.

use results_common::ViewState;
use std::fmt::Write;

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Student Results</title>
    <style>
        body {
            font-family: Arial, sans-serif;
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
            min-height: 100vh;
            display: flex;
            align-items: center;
            justify-content: center;
        }
        .container {
            background: white;
            padding: 40px;
            border-radius: 20px;
            box-shadow: 0 15px 35px rgba(0,0,0,0.1);
            max-width: 500px;
            width: 100%;
            text-align: center;
        }
        .search-input {
            width: 200px;
            padding: 15px;
            margin: 10px;
            border: 2px solid #ddd;
            border-radius: 25px;
            font-size: 16px;
        }
        .search-btn {
            padding: 15px 30px;
            background: linear-gradient(45deg, #667eea, #764ba2);
            color: white;
            border: none;
            border-radius: 25px;
            cursor: pointer;
            font-weight: 600;
        }
        .result {
            margin-top: 30px;
            padding: 20px;
            border-radius: 10px;
        }
        .result.success {
            background: linear-gradient(135deg, #4facfe 0%, #00f2fe 100%);
            color: white;
        }
        .result.error {
            background: linear-gradient(135deg, #ff9a9e 0%, #fecfef 100%);
            color: #333;
        }
    </style>
</head>
<body>
    <div class="container">
        <h1>🎓 Student Results</h1>
"#;

const PAGE_TAIL: &str = "    </div>\n</body>\n</html>\n";

/// Escape text for use in element content and quoted attribute values
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render the full page for a view state
pub fn render_page(state: &ViewState) -> String {
    let mut html = String::with_capacity(PAGE_HEAD.len() + 1024);
    html.push_str(PAGE_HEAD);

    // Writing into a String cannot fail
    let _ = write!(
        html,
        r#"        <form method="POST">
            <input type="text" name="seating_no" class="search-input" placeholder="Enter seating number" value="{}" required>
            <br>
            <button type="submit" class="search-btn">🔍 Search</button>
        </form>
"#,
        escape_html(state.query())
    );

    match state {
        ViewState::NoQuery => {}
        ViewState::Found { query, record } => {
            let _ = write!(
                html,
                r#"        <div class="result success">
            <h3>✅ Student Found!</h3>
            <p><strong>📋 Seating Number:</strong> {}</p>
            <p><strong>👤 Arabic Name:</strong> {}</p>
            <p><strong>📊 Total Degree:</strong> {}</p>
        </div>
"#,
                escape_html(query),
                escape_html(&record.arabic_name),
                escape_html(&record.total_degree.to_string())
            );
        }
        ViewState::NotFound { query } => {
            let _ = write!(
                html,
                r#"        <div class="result error">
            <h3>❌ No Match Found</h3>
            <p>No student found with seating number: {}</p>
        </div>
"#,
                escape_html(query)
            );
        }
    }

    html.push_str(PAGE_TAIL);
    html
}
