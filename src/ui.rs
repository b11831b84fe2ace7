use crate::models::DashboardResponse;
use chrono::NaiveDate;

pub fn render_index(dashboard: &DashboardResponse) -> String {
    let summary = &dashboard.summary;
    let rfm = &dashboard.rfm_summary;

    let min = date_or_blank(dashboard.bounds.map(|b| b.start));
    let max = date_or_blank(dashboard.bounds.map(|b| b.end));
    let start = date_or_blank(dashboard.range.map(|r| r.start));
    let end = date_or_blank(dashboard.range.map(|r| r.end));
    let avg_rating = or_dash(summary.average_rating.map(|v| format!("{v:.1}")));
    let avg_recency = or_dash(rfm.avg_recency.map(|v| format!("{v:.1}")));
    let avg_frequency = or_dash(rfm.avg_frequency.map(|v| format!("{v:.2}")));
    let avg_monetary = or_dash(rfm.avg_monetary_display.clone());

    INDEX_HTML
        .replace("{{MIN}}", &min)
        .replace("{{MAX}}", &max)
        .replace("{{START}}", &start)
        .replace("{{END}}", &end)
        .replace("{{TOTAL_ORDERS}}", &summary.total_orders.to_string())
        .replace("{{AVG_RATING}}", &avg_rating)
        .replace("{{TOTAL_REVENUE}}", &summary.total_revenue_display)
        .replace("{{AVG_RECENCY}}", &avg_recency)
        .replace("{{AVG_FREQUENCY}}", &avg_frequency)
        .replace("{{AVG_MONETARY}}", &avg_monetary)
}

fn date_or_blank(date: Option<NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_default()
}

fn or_dash(value: Option<String>) -> String {
    value.unwrap_or_else(|| "--".to_string())
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>E-Commerce Orders Dashboard</title>
  <style>
    @import url('https://fonts.googleapis.com/css2?family=Space+Grotesk:wght@400;500;600&family=Fraunces:wght@600&display=swap');

    :root {
      --bg-1: #eef3f8;
      --bg-2: #c9dcef;
      --ink: #22303c;
      --accent: #4a90d9;
      --accent-2: #2f4858;
      --muted: #b8c2cc;
      --card: rgba(255, 255, 255, 0.9);
      --shadow: 0 24px 60px rgba(47, 72, 88, 0.16);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: radial-gradient(circle at top, var(--bg-2), transparent 60%),
        linear-gradient(135deg, var(--bg-1), #e4edf6 60%, #f4f7fa 100%);
      color: var(--ink);
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
      display: grid;
      place-items: center;
      padding: 32px 18px 48px;
    }

    .app {
      width: min(1080px, 100%);
      background: var(--card);
      backdrop-filter: blur(12px);
      border-radius: 28px;
      box-shadow: var(--shadow);
      padding: 36px;
      display: grid;
      gap: 32px;
    }

    header {
      display: flex;
      flex-wrap: wrap;
      align-items: flex-end;
      justify-content: space-between;
      gap: 18px;
    }

    h1 {
      font-family: "Fraunces", "Georgia", serif;
      font-weight: 600;
      font-size: clamp(1.8rem, 4vw, 2.6rem);
      margin: 0;
    }

    h2 {
      margin: 0 0 12px;
      font-size: 1.3rem;
    }

    .subtitle {
      margin: 6px 0 0;
      color: #5f6b75;
      font-size: 1rem;
    }

    .range {
      display: flex;
      flex-wrap: wrap;
      gap: 12px;
      align-items: flex-end;
    }

    .range label {
      display: grid;
      gap: 4px;
      font-size: 0.8rem;
      text-transform: uppercase;
      letter-spacing: 0.1em;
      color: #7d8791;
    }

    .range input {
      font: inherit;
      padding: 8px 10px;
      border-radius: 12px;
      border: 1px solid rgba(47, 72, 88, 0.2);
      background: white;
    }

    button {
      appearance: none;
      border: none;
      border-radius: 999px;
      padding: 10px 18px;
      font: inherit;
      font-weight: 600;
      cursor: pointer;
      background: var(--accent-2);
      color: white;
    }

    .panel {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(200px, 1fr));
      gap: 16px;
    }

    .stat {
      background: white;
      border-radius: 18px;
      padding: 18px;
      border: 1px solid rgba(47, 72, 88, 0.08);
      display: grid;
      gap: 8px;
    }

    .stat .label {
      font-size: 0.85rem;
      text-transform: uppercase;
      letter-spacing: 0.12em;
      color: #7d8791;
    }

    .stat .value {
      font-size: 1.7rem;
      font-weight: 600;
      color: var(--accent-2);
    }

    .grid-2 {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(320px, 1fr));
      gap: 24px;
    }

    .grid-3 {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(260px, 1fr));
      gap: 16px;
    }

    .chart-card {
      background: white;
      border-radius: 20px;
      padding: 16px;
      border: 1px solid rgba(47, 72, 88, 0.08);
    }

    .chart-card h3 {
      margin: 0 0 8px;
      font-size: 1rem;
      color: #5f6b75;
    }

    svg {
      width: 100%;
      height: 260px;
      display: block;
    }

    svg text {
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
    }

    .chart-line {
      fill: none;
      stroke: var(--accent);
      stroke-width: 3;
    }

    .chart-point {
      fill: white;
      stroke: var(--accent);
      stroke-width: 2;
    }

    .chart-bar {
      fill: var(--muted);
    }

    .chart-bar.lead {
      fill: var(--accent);
    }

    .chart-grid {
      stroke: rgba(47, 72, 88, 0.12);
    }

    .chart-label {
      fill: #6f7a84;
      font-size: 11px;
    }

    .status {
      font-size: 0.95rem;
      color: #6b645d;
      min-height: 1.2em;
    }

    .status[data-type="error"] {
      color: #c63b2b;
    }

    footer {
      color: #8a949d;
      font-size: 0.85rem;
    }

    @media (max-width: 600px) {
      .app {
        padding: 28px 22px;
      }
    }
  </style>
</head>
<body>
  <main class="app">
    <header>
      <div>
        <h1>E-Commerce Orders Dashboard</h1>
        <p class="subtitle">Orders, ratings, payments and RFM by rating for the selected purchase dates.</p>
      </div>
      <form class="range" id="range-form" method="get" action="/">
        <label>Start date
          <input type="date" id="start" name="start" min="{{MIN}}" max="{{MAX}}" value="{{START}}" />
        </label>
        <label>End date
          <input type="date" id="end" name="end" min="{{MIN}}" max="{{MAX}}" value="{{END}}" />
        </label>
        <button type="submit">Apply</button>
      </form>
    </header>

    <section>
      <h2>Summary</h2>
      <div class="panel">
        <div class="stat">
          <span class="label">Total orders</span>
          <span class="value" id="total-orders">{{TOTAL_ORDERS}}</span>
        </div>
        <div class="stat">
          <span class="label">Average rating</span>
          <span class="value" id="avg-rating">{{AVG_RATING}}</span>
        </div>
        <div class="stat">
          <span class="label">Total revenue</span>
          <span class="value" id="total-revenue">{{TOTAL_REVENUE}}</span>
        </div>
      </div>
    </section>

    <section class="chart-card">
      <h2>Orders by month</h2>
      <svg id="chart-monthly" viewBox="0 0 600 260" role="img" aria-label="Orders by month"></svg>
    </section>

    <section class="grid-2">
      <div class="chart-card">
        <h2>Top 7 categories</h2>
        <svg id="chart-categories" viewBox="0 0 600 260" role="img" aria-label="Top categories"></svg>
      </div>
      <div class="chart-card">
        <h2>Ratings</h2>
        <svg id="chart-ratings" viewBox="0 0 600 260" role="img" aria-label="Ratings"></svg>
      </div>
      <div class="chart-card">
        <h2>Payment type share</h2>
        <svg id="chart-payments" viewBox="0 0 600 260" role="img" aria-label="Payment types"></svg>
      </div>
      <div class="chart-card">
        <h2>Canceled order categories</h2>
        <svg id="chart-canceled" viewBox="0 0 600 260" role="img" aria-label="Canceled orders"></svg>
      </div>
    </section>

    <section>
      <h2>Rating based on RFM</h2>
      <div class="panel">
        <div class="stat">
          <span class="label">Average recency (days)</span>
          <span class="value" id="avg-recency">{{AVG_RECENCY}}</span>
        </div>
        <div class="stat">
          <span class="label">Average frequency</span>
          <span class="value" id="avg-frequency">{{AVG_FREQUENCY}}</span>
        </div>
        <div class="stat">
          <span class="label">Average monetary</span>
          <span class="value" id="avg-monetary">{{AVG_MONETARY}}</span>
        </div>
      </div>
      <div class="grid-3" style="margin-top: 16px;">
        <div class="chart-card">
          <h3>By recency (days)</h3>
          <svg id="chart-recency" viewBox="0 0 600 260" role="img" aria-label="By recency"></svg>
        </div>
        <div class="chart-card">
          <h3>By frequency</h3>
          <svg id="chart-frequency" viewBox="0 0 600 260" role="img" aria-label="By frequency"></svg>
        </div>
        <div class="chart-card">
          <h3>By monetary</h3>
          <svg id="chart-monetary" viewBox="0 0 600 260" role="img" aria-label="By monetary"></svg>
        </div>
      </div>
    </section>

    <div class="status" id="status"></div>
    <footer>Dates filter on purchase date, both ends inclusive.</footer>
  </main>

  <script>
    const form = document.getElementById('range-form');
    const startEl = document.getElementById('start');
    const endEl = document.getElementById('end');
    const statusEl = document.getElementById('status');

    const usd = new Intl.NumberFormat('en-US', { style: 'currency', currency: 'USD' });

    const setStatus = (message, type) => {
      statusEl.textContent = message;
      statusEl.dataset.type = type || '';
    };

    const setText = (id, value) => {
      document.getElementById(id).textContent = value;
    };

    const fixed = (value, decimals) => (typeof value === 'number' ? value.toFixed(decimals) : '--');

    const escapeText = (value) =>
      String(value).replace(/[&<>"]/g, (ch) => ({ '&': '&amp;', '<': '&lt;', '>': '&gt;', '"': '&quot;' })[ch]);

    const emptyChart = (el) => {
      el.innerHTML = '<text class="chart-label" x="50%" y="50%" text-anchor="middle">No data in range</text>';
    };

    const formatAxisValue = (value) => {
      if (Math.abs(value) >= 1000) {
        return `${Math.round(value / 100) / 10}k`;
      }
      const rounded = Math.round(value * 10) / 10;
      return Number.isInteger(rounded) ? rounded.toString() : rounded.toFixed(1);
    };

    const gridLines = (max, y, width, paddingX) => {
      const ticks = 4;
      let grid = '';
      for (let i = 0; i <= ticks; i += 1) {
        const value = (max * i) / ticks;
        const yPos = y(value);
        grid += `<line class="chart-grid" x1="${paddingX}" y1="${yPos}" x2="${width - paddingX}" y2="${yPos}" />`;
        grid += `<text class="chart-label" x="${paddingX - 10}" y="${yPos + 4}" text-anchor="end">${formatAxisValue(value)}</text>`;
      }
      return grid;
    };

    const renderLineChart = (el, points) => {
      if (!points.length) {
        emptyChart(el);
        return;
      }

      const width = 600;
      const height = 260;
      const paddingX = 48;
      const paddingY = 34;
      const top = 24;

      const max = Math.max(1, ...points.map((point) => point.value));
      const xStep = points.length > 1 ? (width - paddingX * 2) / (points.length - 1) : 0;
      const scaleY = (height - top - paddingY) / max;
      const x = (index) => paddingX + index * xStep;
      const y = (value) => height - paddingY - value * scaleY;

      const path = points
        .map((point, index) => `${index === 0 ? 'M' : 'L'} ${x(index).toFixed(2)} ${y(point.value).toFixed(2)}`)
        .join(' ');

      const labelEvery = Math.max(1, Math.ceil(points.length / 8));
      const xLabels = points
        .map((point, index) => {
          if (index % labelEvery !== 0) {
            return '';
          }
          return `<text class="chart-label" x="${x(index)}" y="${height - paddingY + 18}" text-anchor="middle">${escapeText(point.label)}</text>`;
        })
        .join('');

      const circles = points
        .map((point, index) => `<circle class="chart-point" cx="${x(index)}" cy="${y(point.value)}" r="4" />`)
        .join('');

      el.innerHTML = `
        ${gridLines(max, y, width, paddingX)}
        <path class="chart-line" d="${path}" />
        ${circles}
        ${xLabels}
      `;
    };

    const renderBarChart = (el, points, options = {}) => {
      if (!points.length) {
        emptyChart(el);
        return;
      }

      const width = 600;
      const height = 260;
      const paddingX = 48;
      const paddingY = 40;
      const top = 24;

      const max = Math.max(1, ...points.map((point) => point.value));
      const slot = (width - paddingX * 2) / points.length;
      const barWidth = Math.min(64, slot * 0.7);
      const scaleY = (height - top - paddingY) / max;
      const y = (value) => height - paddingY - value * scaleY;

      const bars = points
        .map((point, index) => {
          const cx = paddingX + slot * index + slot / 2;
          const lead = options.highlightFirst && index === 0 ? ' lead' : '';
          const label = escapeText(point.label).slice(0, 14);
          return `
            <rect class="chart-bar${lead}" x="${cx - barWidth / 2}" y="${y(point.value)}" width="${barWidth}" height="${height - paddingY - y(point.value)}" rx="6" />
            <text class="chart-label" x="${cx}" y="${y(point.value) - 6}" text-anchor="middle">${escapeText(point.display ?? formatAxisValue(point.value))}</text>
            <text class="chart-label" x="${cx}" y="${height - paddingY + 18}" text-anchor="middle">${label}</text>`;
        })
        .join('');

      el.innerHTML = `${gridLines(max, y, width, paddingX)}${bars}`;
    };

    const shareOf = (rows) => {
      const total = rows.reduce((acc, row) => acc + row.count, 0);
      return (count) => (total === 0 ? 0 : (count * 100) / total);
    };

    const render = (data) => {
      const summary = data.summary;
      setText('total-orders', summary.total_orders);
      setText('avg-rating', fixed(summary.average_rating, 1));
      setText('total-revenue', summary.total_revenue_display);

      const rfmSummary = data.rfm_summary;
      setText('avg-recency', fixed(rfmSummary.avg_recency, 1));
      setText('avg-frequency', fixed(rfmSummary.avg_frequency, 2));
      setText('avg-monetary', rfmSummary.avg_monetary_display || '--');

      renderLineChart(
        document.getElementById('chart-monthly'),
        data.monthly_orders.map((point) => ({ label: point.month, value: point.order_count }))
      );

      renderBarChart(
        document.getElementById('chart-categories'),
        data.top_categories.map((row) => ({ label: row.category, value: row.count })),
        { highlightFirst: true }
      );

      renderBarChart(
        document.getElementById('chart-ratings'),
        data.ratings.map((row) => ({ label: `${row.review_score}`, value: row.count }))
      );

      const paymentShare = shareOf(data.payment_types);
      renderBarChart(
        document.getElementById('chart-payments'),
        data.payment_types.map((row) => {
          const share = paymentShare(row.count);
          return { label: row.payment_type, value: share, display: `${share.toFixed(1)}%` };
        }),
        { highlightFirst: true }
      );

      const canceledShare = shareOf(data.canceled_categories);
      renderBarChart(
        document.getElementById('chart-canceled'),
        data.canceled_categories.map((row) => ({
          label: row.category,
          value: row.count,
          display: `${canceledShare(row.count).toFixed(1)}%`
        }))
      );

      const byRecency = [...data.rfm].sort((a, b) => a.recency - b.recency).slice(0, 5);
      const byFrequency = [...data.rfm].sort((a, b) => b.frequency - a.frequency).slice(0, 5);
      const byMonetary = [...data.rfm].sort((a, b) => b.monetary - a.monetary).slice(0, 5);

      renderBarChart(
        document.getElementById('chart-recency'),
        byRecency.map((row) => ({ label: `${row.review_score}`, value: row.recency }))
      );
      renderBarChart(
        document.getElementById('chart-frequency'),
        byFrequency.map((row) => ({ label: `${row.review_score}`, value: row.frequency }))
      );
      renderBarChart(
        document.getElementById('chart-monetary'),
        byMonetary.map((row) => ({ label: `${row.review_score}`, value: row.monetary, display: usd.format(row.monetary) }))
      );
    };

    const load = async () => {
      const params = new URLSearchParams();
      if (startEl.value) {
        params.set('start', startEl.value);
      }
      if (endEl.value) {
        params.set('end', endEl.value);
      }
      const res = await fetch(`/api/dashboard?${params}`);
      if (!res.ok) {
        const msg = await res.text();
        throw new Error(msg || 'Unable to load dashboard');
      }
      const data = await res.json();
      if (data.range) {
        startEl.value = data.range.start;
        endEl.value = data.range.end;
      }
      history.replaceState(null, '', `/?${params}`);
      render(data);
      setStatus('', '');
    };

    form.addEventListener('submit', (event) => {
      event.preventDefault();
      load().catch((err) => setStatus(err.message, 'error'));
    });

    [startEl, endEl].forEach((input) => {
      input.addEventListener('change', () => load().catch((err) => setStatus(err.message, 'error')));
    });

    load().catch((err) => setStatus(err.message, 'error'));
  </script>
</body>
</html>
"#;
