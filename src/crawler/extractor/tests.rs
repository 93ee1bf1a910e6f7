use super::*;

fn url(raw: &str) -> Url {
    Url::parse(raw).expect("url should parse")
}

#[test]
fn generic_posting_page() {
    let html = r#"
        <html>
            <head><title>Careers | Acme</title></head>
            <body>
                <nav>Home Jobs About Contact Login Sign up for our newsletter</nav>
                <h1>Senior Backend Engineer</h1>
                <ul>
                    <li><strong>Company:</strong> Acme Corp</li>
                    <li>Location: Lyon, France</li>
                </ul>
                <main>
                    <p>We are looking for a backend engineer to build our payment
                    platform. You will design APIs in Python and Go, operate
                    PostgreSQL clusters, and deploy everything with Docker and
                    Kubernetes on AWS. Experience with CI/CD pipelines is a plus.</p>
                </main>
                <footer>Copyright Acme</footer>
            </body>
        </html>
    "#;

    let posting = extract_posting(html, &url("https://careers.acme.example/jobs/42"))
        .expect("posting should be extracted");

    assert_eq!(posting.url, "https://careers.acme.example/jobs/42");
    assert_eq!(posting.title, "Senior Backend Engineer");
    assert_eq!(posting.company.as_deref(), Some("Acme Corp"));
    assert_eq!(posting.location.as_deref(), Some("Lyon, France"));
    assert!(posting.raw_text.starts_with("We are looking for a backend engineer"));
    assert!(!posting.raw_text.contains("newsletter"));
}

#[test]
fn title_falls_back_to_title_tag() {
    let html = "<html><head><title>Data Analyst H/F</title></head><body><p>Short</p></body></html>";
    let posting = extract_posting(html, &url("https://example.com/offre/1"))
        .expect("posting should be extracted");
    assert_eq!(posting.title, "Data Analyst H/F");
    assert_eq!(posting.company, None);
    assert_eq!(posting.location, None);
}

#[test]
fn page_without_title_yields_nothing() {
    let html = "<html><body><p>No heading anywhere</p></body></html>";
    assert!(extract_posting(html, &url("https://example.com/offre/2")).is_none());
}

#[test]
fn longest_block_fallback() {
    let long = "Responsibilities include maintaining data pipelines in Spark and Airflow. ".repeat(3);
    let html = format!(
        r#"<html><body>
            <h1>Data Engineer</h1>
            <div class="sidebar">Related offers</div>
            <div class="content">{long}</div>
            <script>var tracking = "{long}{long}";</script>
        </body></html>"#
    );
    let posting =
        extract_posting(&html, &url("https://example.com/job/3")).expect("posting should be extracted");
    assert!(posting.raw_text.contains("Spark and Airflow"));
    assert!(!posting.raw_text.contains("tracking"));
    assert!(!posting.raw_text.contains("Related offers"));
}

#[test]
fn short_main_is_skipped() {
    let long = "Build dashboards with Power BI and Tableau for finance teams. ".repeat(4);
    let html = format!(
        r#"<html><body>
            <h1>BI Analyst</h1>
            <main>Too short</main>
            <section>{long}</section>
        </body></html>"#
    );
    let posting =
        extract_posting(&html, &url("https://example.com/job/4")).expect("posting should be extracted");
    assert!(posting.raw_text.contains("Power BI"));
}

#[test]
fn domain_rules_take_precedence() {
    let html = r#"
        <html><body>
            <h1>Generic heading</h1>
            <h1 class="offer-title">Chef de projet data</h1>
            <p class="org-name">Banque Exemple</p>
            <p class="location">Paris 75</p>
            <div class="details-offer-body">Pilotage de projets Power BI et SQL.</div>
        </body></html>
    "#;
    let posting = extract_posting(html, &url("https://www.apec.fr/candidat/offre/123"))
        .expect("posting should be extracted");
    assert_eq!(posting.title, "Chef de projet data");
    assert_eq!(posting.company.as_deref(), Some("Banque Exemple"));
    assert_eq!(posting.location.as_deref(), Some("Paris 75"));
    assert_eq!(posting.raw_text, "Pilotage de projets Power BI et SQL.");
}

#[test]
fn french_labels() {
    let html = r#"
        <html><body>
            <h1>Développeur Java</h1>
            <p>Entreprise : Société Générale Tech</p>
            <p>Lieu : Nantes</p>
        </body></html>
    "#;
    let posting = extract_posting(html, &url("https://example.fr/emploi/9"))
        .expect("posting should be extracted");
    assert_eq!(posting.company.as_deref(), Some("Société Générale Tech"));
    assert_eq!(posting.location.as_deref(), Some("Nantes"));
}

#[test]
fn registrable_domains() {
    assert_eq!(
        registrable_domain(&url("https://jobs.apec.fr/x")).as_deref(),
        Some("apec.fr")
    );
    assert_eq!(
        registrable_domain(&url("https://example.com")).as_deref(),
        Some("example.com")
    );
    assert!(rules_for(&url("https://www.welcometothejungle.com/fr/jobs/1")).is_some());
    assert!(rules_for(&url("https://example.com/jobs/1")).is_none());
}

#[test]
fn html_fragments() {
    assert_eq!(
        html_to_text("<p>Hello <b>Rust</b></p><script>alert(1)</script>"),
        "Hello Rust"
    );
    // Escaped markup decodes to markup on the first pass
    let escaped = "&lt;p&gt;Python &amp;amp; SQL&lt;/p&gt;";
    assert_eq!(html_to_text(&html_to_text(escaped)), "Python & SQL");
}

#[test]
fn content_types() {
    assert!(ensure_html(Some("text/html; charset=utf-8")).is_ok());
    assert!(ensure_html(Some("application/xhtml+xml")).is_ok());
    assert!(ensure_html(None).is_ok());
    assert!(ensure_html(Some("application/pdf")).is_err());
}

#[test]
fn configured_rules_apply_to_subdomains_and_win() {
    let custom = DomainRules {
        domain: "jobs.example".to_string(),
        title: vec!["h2.role".to_string()],
        company: vec!["span.employer".to_string()],
        ..DomainRules::default()
    };
    assert!(custom.applies_to(&url("https://careers.jobs.example/offer/1")));
    assert!(custom.applies_to(&url("https://JOBS.example/offer/1")));
    assert!(!custom.applies_to(&url("https://notjobs.example/offer/1")));

    let html = r#"
        <html><body>
            <h1>Careers at Example</h1>
            <h2 class="role">Site Reliability Engineer</h2>
            <span class="employer">Hooli</span>
            <p>Location: Remote</p>
        </body></html>
    "#;
    let extractor = PostingExtractor::new(vec![custom]);
    let posting = extractor
        .extract(html, &url("https://careers.jobs.example/offer/1"))
        .expect("posting should be extracted");
    assert_eq!(posting.title, "Site Reliability Engineer");
    assert_eq!(posting.company.as_deref(), Some("Hooli"));
    // No location selector configured, so the label pattern is used
    assert_eq!(posting.location.as_deref(), Some("Remote"));

    // Built-in parsing of the same page only knows the generic heuristics
    let generic = extract_posting(html, &url("https://careers.jobs.example/offer/1"))
        .expect("posting should be extracted");
    assert_eq!(generic.title, "Careers at Example");
}

#[test]
fn configured_rules_replace_builtin_ones() {
    let page = url("https://www.apec.fr/candidat/offre/7");
    let extractor = PostingExtractor::new(vec![DomainRules {
        domain: "apec.fr".to_string(),
        title: vec!["h3".to_string()],
        ..DomainRules::default()
    }]);
    assert_eq!(
        extractor.rules_for(&page).map(|r| r.title.clone()),
        Some(vec!["h3".to_string()])
    );
    assert!(PostingExtractor::default().rules_for(&page).is_some());
    assert!(
        PostingExtractor::default()
            .rules_for(&url("https://example.com/1"))
            .is_none()
    );
}
