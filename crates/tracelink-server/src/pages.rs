//! Static documents served by the two listeners.

pub const CAPTURE_INDEX: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>tracelink</title></head>
<body>
  <h1>tracelink</h1>
  <p>This host records visits to links issued by its operator.</p>
</body>
</html>
"#;

const LANDING_TEMPLATE: &str = r#"<!doctype html>
<html>
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width,initial-scale=1">
  <meta name="tracelink-session" content="__SESSION__">
  <title>Link opened</title>
</head>
<body data-session="__SESSION__">
  <h1>Link opened</h1>
  <p>Reference: <code>__SESSION__</code></p>
</body>
</html>
"#;

pub const OPERATOR_CONSOLE: &str = r#"<!doctype html>
<html>
<head>
  <meta charset="utf-8">
  <title>tracelink console</title>
  <style>
    body { font-family: sans-serif; margin: 2em; }
    table { border-collapse: collapse; width: 100%; }
    td, th { border: 1px solid #ccc; padding: 4px 8px; text-align: left; font-size: 13px; }
    pre { margin: 0; white-space: pre-wrap; }
  </style>
</head>
<body>
  <h1>tracelink console</h1>
  <p>
    <input id="custom-url" placeholder="custom base URL (optional)" size="40">
    <button id="generate">Issue link</button>
    <button id="refresh">Refresh</button>
    <button id="clear">Clear log</button>
  </p>
  <div id="issued"></div>
  <table>
    <thead><tr><th>id</th><th>time</th><th>session</th><th>ip</th><th>ua</th><th>payload</th></tr></thead>
    <tbody id="events"></tbody>
  </table>
  <script>
  function cell(text) {
    const td = document.createElement('td');
    const pre = document.createElement('pre');
    pre.textContent = text;
    td.appendChild(pre);
    return td;
  }
  async function refresh() {
    const events = await (await fetch('/admin/logs')).json();
    const body = document.getElementById('events');
    body.replaceChildren();
    for (const e of events) {
      const tr = document.createElement('tr');
      for (const v of [e.id, e.time, e.session, e.ip, e.ua, JSON.stringify(e.payload)]) {
        tr.appendChild(cell(String(v)));
      }
      body.appendChild(tr);
    }
  }
  document.getElementById('refresh').onclick = refresh;
  document.getElementById('clear').onclick = async () => {
    if (!confirm('Delete every stored event?')) return;
    await fetch('/admin/clear_logs', { method: 'POST' });
    refresh();
  };
  document.getElementById('generate').onclick = async () => {
    const custom = document.getElementById('custom-url').value;
    const r = await fetch('/admin/generate?custom_url=' + encodeURIComponent(custom));
    const j = await r.json();
    const box = document.getElementById('issued');
    box.replaceChildren();
    if (j.error) { box.textContent = j.error; return; }
    const img = document.createElement('img');
    img.src = j.qr; img.width = 240;
    const info = document.createElement('pre');
    info.textContent = `session: ${j.session}\nurl: ${j.visit_url}\nsaved: ${j.saved_file}`;
    box.append(img, info);
  };
  refresh();
  </script>
</body>
</html>
"#;

/// Landing document for a visit, with the session id embedded.
pub fn render_landing(session: &str) -> String {
    LANDING_TEMPLATE.replace("__SESSION__", &escape_html(session))
}

/// Escape text for use in HTML content and double-quoted attributes.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landing_embeds_session() {
        let html = render_landing("1700000000000");
        assert!(html.contains(r#"data-session="1700000000000""#));
        assert!(!html.contains("__SESSION__"));
    }

    #[test]
    fn landing_escapes_markup() {
        let html = render_landing(r#""><script>alert(1)</script>"#);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&quot;&gt;&lt;script&gt;"));
    }

    #[test]
    fn escape_html_passthrough() {
        assert_eq!(escape_html("plain-123"), "plain-123");
        assert_eq!(escape_html("a&b'c"), "a&amp;b&#x27;c");
    }
}
