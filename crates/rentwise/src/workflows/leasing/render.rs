use std::fmt::{self, Write as _};

use super::builder::{LeaseDraft, PartyRole, SectionKind};

const STYLE: &str = "body{font-family:Georgia,serif;max-width:46rem;margin:2rem auto;line-height:1.5}\
h1{font-size:1.4rem;text-align:center}h2{font-size:1.1rem;margin-top:1.6rem}\
.disclosure{border:1px solid #999;padding:.6rem 1rem;margin:.8rem 0}\
.citation{font-size:.85rem;color:#444}.ack{font-weight:bold}\
.signature{margin-top:1.4rem}";

/// Render a lease draft as a standalone HTML document.
pub fn render_html(draft: &LeaseDraft) -> Result<String, fmt::Error> {
    let mut html = String::new();
    writeln!(html, "<!DOCTYPE html>")?;
    writeln!(html, "<html lang=\"en\">")?;
    writeln!(html, "<head>")?;
    writeln!(html, "<meta charset=\"utf-8\">")?;
    writeln!(html, "<title>{}</title>", escape_html(&draft.title))?;
    writeln!(html, "<style>{STYLE}</style>")?;
    writeln!(html, "</head>")?;
    writeln!(html, "<body>")?;
    writeln!(html, "<h1>{}</h1>", escape_html(&draft.title))?;

    for (index, section) in draft.sections.iter().enumerate() {
        writeln!(
            html,
            "<section id=\"{}\">",
            section.heading.to_ascii_lowercase().replace(' ', "-")
        )?;
        writeln!(html, "<h2>{}. {}</h2>", index + 1, escape_html(section.heading))?;
        for paragraph in &section.paragraphs {
            writeln!(html, "<p>{}</p>", escape_html(paragraph))?;
        }

        match section.kind {
            SectionKind::Disclosures => write_disclosures(&mut html, draft)?,
            SectionKind::Signatures => write_signature_blocks(&mut html, draft)?,
            _ => {}
        }
        writeln!(html, "</section>")?;
    }

    writeln!(
        html,
        "<footer><p class=\"citation\">Generated {} for a property in {}.</p></footer>",
        draft.generated_on.format("%Y-%m-%d"),
        escape_html(draft.state.as_str())
    )?;
    writeln!(html, "</body>")?;
    writeln!(html, "</html>")?;
    Ok(html)
}

fn write_disclosures(html: &mut String, draft: &LeaseDraft) -> fmt::Result {
    for disclosure in &draft.disclosures {
        writeln!(
            html,
            "<div class=\"disclosure\" data-key=\"{}\" data-layer=\"{}\">",
            escape_html(&disclosure.key),
            disclosure.layer.label().to_ascii_lowercase()
        )?;
        writeln!(html, "<h3>{}</h3>", escape_html(&disclosure.title))?;
        writeln!(html, "<p>{}</p>", escape_html(&disclosure.body))?;
        if let Some(citation) = &disclosure.citation {
            writeln!(
                html,
                "<p class=\"citation\">{} law: {}</p>",
                disclosure.layer.label(),
                escape_html(citation)
            )?;
        }
        if disclosure.acknowledgement_required {
            let initials = draft
                .parties
                .iter()
                .filter(|party| party.role == PartyRole::Tenant)
                .map(|party| format!("{} ______", escape_html(&party.name)))
                .collect::<Vec<_>>()
                .join(" &nbsp; ");
            writeln!(html, "<p class=\"ack\">Tenant initials: {initials}</p>")?;
        }
        writeln!(html, "</div>")?;
    }
    Ok(())
}

fn write_signature_blocks(html: &mut String, draft: &LeaseDraft) -> fmt::Result {
    for party in &draft.parties {
        let role = match party.role {
            PartyRole::Landlord => "Landlord",
            PartyRole::Tenant => "Tenant",
        };
        writeln!(
            html,
            "<div class=\"signature\"><p>______________________________ Date: __________</p><p>{}: {} &lt;{}&gt;</p></div>",
            role,
            escape_html(&party.name),
            escape_html(&party.email)
        )?;
    }
    Ok(())
}

pub(crate) fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::super::builder::fixtures::{tenant, terms};
    use super::super::builder::LeaseBuilder;
    use super::super::jurisdiction::ClauseRegistry;
    use super::*;

    #[test]
    fn renders_escaped_standalone_document() {
        let registry = ClauseRegistry::standard();
        let mut terms = terms("NY", "New York");
        terms.tenants.push(tenant("ten-b", "Jo <script>"));
        terms.additional_terms = vec!["Quiet hours & parking rules apply.".to_string()];
        let draft = LeaseBuilder::new(&registry)
            .build(&terms, NaiveDate::from_ymd_opt(2024, 5, 1).expect("date"))
            .expect("draft");

        let html = render_html(&draft).expect("html");
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("Jo &lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("Quiet hours &amp; parking rules apply."));
        assert!(html.contains("data-key=\"nyc_window_guards\""));
        assert!(html.contains("<h2>9. Joint and Several Liability</h2>"));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn escape_handles_quotes() {
        assert_eq!(escape_html("a \"b\" 'c'"), "a &quot;b&quot; &#39;c&#39;");
    }
}
