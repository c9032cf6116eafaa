//! Branded HTML shell around rendered template bodies.

use chrono::NaiveDate;

const LOGO_URL: &str = "https://farm2fork.hu/assets/logo/f2fsingle.png";
const BRAND_GREEN: &str = "#4a6e50";

/// Header and footer text of the branded email layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailLayout {
    pub header: String,
    pub footer: String,
}

impl Default for EmailLayout {
    fn default() -> Self {
        Self {
            header: "Köszönjük a rendelést".to_owned(),
            footer: "Farm2Fork".to_owned(),
        }
    }
}

impl EmailLayout {
    #[must_use]
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    /// Wraps an already rendered body into the full HTML document.
    #[must_use]
    pub fn wrap(&self, subject: &str, body: &str) -> String {
        format!(
            concat!(
                "<html><head><meta charset=\"utf-8\"><title>{subject}</title></head>",
                "<body style=\"margin:0;padding:0;background:#f5f5f5;\">",
                "<table width=\"100%\" cellpadding=\"0\" cellspacing=\"0\" style=\"background:#f5f5f5;\"><tr><td align=\"center\">",
                "<table width=\"600\" cellpadding=\"0\" cellspacing=\"0\" style=\"max-width:600px;width:100%;\">",
                "<tr><td align=\"center\" style=\"padding:32px 0 24px;\">",
                "<img src=\"{logo}\" alt=\"Farm2Fork\" width=\"64\" style=\"display:block;\"></td></tr>",
                "<tr><td style=\"background:#ffffff;border:1px solid #dcdcdc;border-radius:8px;\">",
                "<table width=\"100%\" cellpadding=\"0\" cellspacing=\"0\">",
                "<tr><td style=\"background:{green};border-radius:8px 8px 0 0;padding:32px 48px;\">",
                "<h1 style=\"margin:0;color:#ffffff;font-family:Arial,sans-serif;font-size:24px;font-weight:600;\">{header}</h1>",
                "</td></tr>",
                "<tr><td style=\"padding:48px 48px 32px;\">",
                "<div style=\"color:rgb(81,81,81);font-family:Arial,sans-serif;font-size:14px;line-height:1.5;\">{body}</div>",
                "</td></tr></table></td></tr>",
                "<tr><td style=\"padding:24px 0;\">",
                "<p style=\"margin:0;color:#8a8a8a;font-family:Arial,sans-serif;font-size:12px;text-align:center;\">{footer}</p>",
                "</td></tr></table></td></tr></table></body></html>"
            ),
            subject = subject,
            logo = LOGO_URL,
            green = BRAND_GREEN,
            header = self.header,
            body = body,
            footer = self.footer,
        )
    }
}

/// Highlighted "expected delivery" banner, or an empty string without a date.
#[must_use]
pub fn expected_delivery_section(date: Option<NaiveDate>) -> String {
    date.map_or_else(String::new, |d| {
        format!(
            "<span style=\"text-align: center;padding: 12px;background: #cecece;font-weight: 600;border-radius: 8px;width: 100%;display: inline-block;\">Várható kézbesítés: {}</span>",
            d.format("%Y. %m. %d.")
        )
    })
}
