//! ==============================================================================
//! render.rs - server-side html for the dashboard page
//! ==============================================================================
//!
//! purpose:
//!     turns a DashboardView into the single dashboard page: location switcher,
//!     metric menu, analog/digital clock, metric cards, advisory text and the
//!     metric detail overlay. no business logic lives here.
//!
//!     every control is a plain html form posting to the json api; the
//!     handlers redirect form posts back to "/". a meta refresh keeps the clock
//!     and the values current without client-side scripting.
//!
//! relationships:
//!     - used by: main.rs (GET /)
//!     - uses: clock.rs (hand angles, digital text), state.rs (DashboardView)
//!
//! ==============================================================================

use crate::clock::{hour_markers, ClockFace};
use crate::domain::{EnvironmentSnapshot, Metric};
use crate::registry::LocationRegistry;
use crate::state::{DashboardView, Modal};
use std::fmt::Write;

const PLACEHOLDER_BARS: [u8; 5] = [40, 70, 50, 90, 60];
const DATA_SOURCE: &str = "數據來源：LASS 開源感測網路";

pub struct PageOptions<'a> {
    pub title: &'a str,
    pub refresh_seconds: u64,
}

/// card text for one metric, "--" while there is nothing to show
pub fn format_value(snapshot: Option<&EnvironmentSnapshot>, metric: Metric) -> String {
    let Some(snapshot) = snapshot else {
        return match metric {
            Metric::Precipitation => "0".to_string(),
            _ => "--".to_string(),
        };
    };

    let value = snapshot.value(metric);
    if metric == Metric::Pm25 && value == 0.0 {
        return "--".to_string();
    }

    match metric.precision() {
        Some(dp) => format!("{:.*}", dp, value),
        None => format!("{}", value),
    }
}

pub fn render_page(view: &DashboardView, registry: &LocationRegistry, opts: &PageOptions<'_>) -> String {
    let mut html = String::with_capacity(8 * 1024);
    let title = html_escape(opts.title);

    let _ = write!(
        html,
        r#"<!doctype html>
<html lang="zh-Hant-TW">
<head>
<meta charset="utf-8">
<meta http-equiv="refresh" content="{refresh}">
<title>{title}</title>
<style>{STYLE}</style>
</head>
<body>
<div class="app-root">
<header class="header">{title}</header>
<div class="app-container">
<aside class="sidebar">
"#,
        refresh = opts.refresh_seconds.max(1),
        title = title,
    );

    render_switcher(&mut html, view, registry);
    render_menu(&mut html);
    render_clock(&mut html, &ClockFace::at(&view.ui.now));

    html.push_str("</aside>\n<main class=\"main\">\n");
    render_cards(&mut html, view);
    html.push_str("</main>\n</div>\n");

    if let Some(modal) = &view.ui.modal {
        render_modal(&mut html, &view.location.name, modal);
    }

    html.push_str("</div>\n</body>\n</html>\n");
    html
}

fn render_switcher(html: &mut String, view: &DashboardView, registry: &LocationRegistry) {
    let _ = write!(
        html,
        r#"<div class="dropdown-container">
<form method="post" action="/api/dropdown"><button class="dropdown-btn" type="submit">{} ▼</button></form>
"#,
        html_escape(&view.location.name)
    );

    if view.ui.dropdown_open {
        html.push_str("<ul class=\"dropdown-list\">\n");
        for loc in registry.iter() {
            let _ = writeln!(
                html,
                r#"<li><form method="post" action="/api/location?id={id}"><button type="submit">{name}</button></form></li>"#,
                id = html_escape(&urlencoding::encode(&loc.id)),
                name = html_escape(&loc.name),
            );
        }
        html.push_str("</ul>\n");
    }

    html.push_str("</div>\n");
}

fn render_menu(html: &mut String) {
    html.push_str("<nav class=\"menu\">\n");
    for metric in Metric::MENU {
        let _ = writeln!(
            html,
            r#"<form method="post" action="/api/modal?metric={}"><button type="submit">{}</button></form>"#,
            metric.tag(),
            metric.title()
        );
    }
    html.push_str("</nav>\n");
}

fn render_clock(html: &mut String, face: &ClockFace) {
    html.push_str(
        "<div class=\"clock\">\n<div class=\"clock-svg\">\n<svg viewBox=\"0 0 100 100\">\n\
         <circle cx=\"50\" cy=\"50\" r=\"45\" fill=\"none\" stroke=\"#fff\" stroke-width=\"4\" />\n",
    );
    for (x, y) in hour_markers() {
        let _ = writeln!(html, r##"<circle cx="{x:.2}" cy="{y:.2}" r="2" fill="#fff" />"##);
    }
    let _ = write!(
        html,
        r##"<rect x="48" y="25" width="4" height="25" rx="2" fill="#ddd" transform="rotate({h}, 50, 50)" />
<rect x="48.5" y="18" width="3" height="32" rx="1.5" fill="#fff" transform="rotate({m}, 50, 50)" />
<rect x="49" y="16" width="2" height="34" rx="1" fill="#ff4444" transform="rotate({s}, 50, 50)" />
<circle cx="50" cy="50" r="4" fill="#fff" />
</svg>
</div>
<div class="clock-digital">
<div class="date-display">{weekday} {date}</div>
<div class="time-display">{time}</div>
</div>
</div>
"##,
        h = face.hour_deg,
        m = face.minute_deg,
        s = face.second_deg,
        weekday = face.weekday,
        date = face.date,
        time = face.time,
    );
}

fn render_cards(html: &mut String, view: &DashboardView) {
    let snap = view.snapshot.as_ref();
    let value = |metric| format_value(snap, metric);

    let _ = write!(
        html,
        r#"<section class="top-block columns">
<div class="pm25-card">
<div class="card-label">PM2.5</div>
<div class="card-value large">{pm25} <small>{pm25_unit}</small></div>
<div class="ai-insight">{insight}</div>
</div>
<div class="right-stack">
"#,
        pm25 = value(Metric::Pm25),
        pm25_unit = Metric::Pm25.unit(),
        insight = html_escape(&view.insight),
    );

    for metric in [Metric::Temperature, Metric::Sunlight, Metric::Windspeed, Metric::Humidity] {
        metric_card(html, metric, &value(metric));
    }
    html.push_str("</div>\n</section>\n<section class=\"bottom-block columns\">\n<div class=\"connected-group\">\n");

    // the bottom row uses short labels
    for (label, metric) in [("CO2", Metric::Co2), ("TVOC", Metric::Tvoc), ("用電", Metric::Electricity)] {
        let _ = writeln!(
            html,
            r#"<div class="connected-card"><span class="label">{label}</span><span class="value">{} {}</span></div>"#,
            value(metric),
            metric.unit()
        );
    }

    let _ = write!(
        html,
        r#"</div>
<div class="small-card-row">
<div class="small-card"><div class="label">{}</div><div class="value">{}%</div></div>
<div class="small-card icon-card"><div class="weather-icon">☀️</div></div>
</div>
</section>
"#,
        Metric::Precipitation.title(),
        value(Metric::Precipitation),
    );
}

fn metric_card(html: &mut String, metric: Metric, value: &str) {
    let sep = if metric == Metric::Temperature { "" } else { " " };
    let _ = writeln!(
        html,
        r#"<div class="metric-card"><span class="label">{}</span><span class="value">{value}{sep}{}</span></div>"#,
        metric.title(),
        metric.unit()
    );
}

fn render_modal(html: &mut String, location_name: &str, modal: &Modal) {
    let title = html_escape(&modal.title);
    let _ = write!(
        html,
        r#"<div class="modal-overlay active" data-metric="{tag}">
<div class="modal-content">
<div class="modal-header">
<h2 class="modal-title">{location} {title} 歷史數據</h2>
<form method="post" action="/api/modal/close"><button class="modal-close" type="submit">&times;</button></form>
</div>
<div class="modal-body">
<p>正在加載 {title} 的歷史統計圖表...</p>
<div class="placeholder-chart">
"#,
        tag = modal.metric.tag(),
        location = html_escape(location_name),
        title = title,
    );
    for height in PLACEHOLDER_BARS {
        let _ = writeln!(html, r#"<div class="bar" style="height: {height}%"></div>"#);
    }
    let _ = write!(
        html,
        "</div>\n<p class=\"chart-footer\">{DATA_SOURCE}</p>\n</div>\n</div>\n</div>\n"
    );
}

/// escape html special characters to prevent xss
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const STYLE: &str = "\
body{margin:0;font-family:system-ui,sans-serif;background:#1a1a2e;color:#eee}\
.header{padding:1rem 2rem;font-size:1.6rem;font-weight:bold;background:#16213e}\
.app-container{display:flex;gap:1rem;padding:1rem}\
.sidebar{width:220px;display:flex;flex-direction:column;gap:1rem}\
.main{flex:1;display:flex;flex-direction:column;gap:1rem}\
.columns{display:flex;gap:1rem}\
button{font:inherit;color:inherit;background:#0f3460;border:0;border-radius:6px;padding:.4rem .8rem;cursor:pointer;width:100%;text-align:left}\
.dropdown-list,.menu{list-style:none;margin:0;padding:0;display:flex;flex-direction:column;gap:.3rem}\
.pm25-card,.metric-card,.connected-card,.small-card{background:#16213e;border-radius:8px;padding:1rem}\
.pm25-card{flex:2}.right-stack{flex:1;display:flex;flex-direction:column;gap:.5rem}\
.metric-card,.connected-card{display:flex;justify-content:space-between}\
.connected-group{flex:2;display:flex;flex-direction:column;gap:.5rem}\
.small-card-row{flex:1;display:flex;gap:.5rem}\
.card-value.large{font-size:4rem}.ai-insight{margin-top:1rem;color:#9ad}\
.modal-overlay{position:fixed;inset:0;background:rgba(0,0,0,.6);display:flex;align-items:center;justify-content:center}\
.modal-content{background:#16213e;border-radius:8px;padding:1.5rem;min-width:420px}\
.modal-header{display:flex;justify-content:space-between;align-items:center}\
.modal-close{width:auto}\
.placeholder-chart{display:flex;align-items:flex-end;gap:.5rem;height:160px}\
.bar{flex:1;background:#0f3460}\
.chart-footer{color:#888;font-size:.8rem}";
