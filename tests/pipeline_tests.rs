mod common;

use common::{build_deck, jpeg, png, simple_slide, slide_xml, text_shape, StubFetcher};
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use tempfile::tempdir;
use vision_deck::{
    DirectoryStore, Error, ErrorCategory, GenerationData, GenerationOptions, GenerationRequest, Generator,
    GeneratorConfig, Layout, Module, Package, Project, SlideRole, TemplateSource, Workstation,
};

const TEMPLATE_URL: &str = "https://files.test/template.pptx";

fn generator() -> Generator {
    Generator::new(GeneratorConfig::default())
}

fn workstation(name: &str) -> Workstation {
    Workstation { name: name.to_string(), ..Default::default() }
}

fn project_data(workstations: Vec<Workstation>) -> GenerationData {
    GenerationData {
        project: Project { name: "AOI".into(), customer: "Acme".into(), date: "2024-05-20".into(), ..Default::default() },
        workstations,
        ..Default::default()
    }
}

fn proposal_template() -> Vec<u8> {
    build_deck(&[
        simple_slide(&["{{project_name}} 技术方案", "{{customer}}"]),
        simple_slide(&["基本信息", "工位：{{workstation_name}}"]),
        simple_slide(&["检测要求", "{{workstation_name}}"]),
        simple_slide(&["三视图", "{{workstation_name}}"]),
        simple_slide(&["光学方案", "{{workstation_name}}"]),
    ])
}

#[test]
fn test_slides_are_processed_in_numeric_order() {
    let slides: Vec<String> = (1..=11).map(|n| simple_slide(&[&format!("Slide {n}")])).collect();
    let package = Package::from_bytes(&build_deck(&slides)).unwrap();

    let deck = generator()
        .generate_package(package, &GenerationData::default(), &GenerationOptions::default(), None)
        .unwrap();

    let paths: Vec<&str> = deck.report.slides.iter().map(|s| s.path.as_str()).collect();
    let expected: Vec<String> = (1..=11).map(|n| format!("ppt/slides/slide{n}.xml")).collect();
    assert_eq!(paths, expected.iter().map(String::as_str).collect::<Vec<_>>());
    assert_eq!(deck.report.slides[0].role, SlideRole::Cover);
    assert_eq!(deck.report.slides[10].index, 10);
}

#[test]
fn test_empty_data_round_trip() {
    let bytes = proposal_template();
    let original = Package::from_bytes(&bytes).unwrap();

    let deck = generator()
        .generate_package(original.clone(), &GenerationData::default(), &GenerationOptions::default(), None)
        .unwrap();

    let output = Package::from_bytes(&deck.bytes).unwrap();
    assert_eq!(output.part_count(), original.part_count());
    assert_eq!(output.slide_paths(), original.slide_paths());
    assert_eq!(deck.file_name, "presentation.pptx");
    assert_eq!(deck.mime_type, vision_deck::PPTX_MIME_TYPE);
    assert_eq!(deck.report.generated_slides, 0);
    assert_eq!(deck.report.images_injected, 0);
}

#[test]
fn test_placeholders_are_filled() {
    let package = Package::from_bytes(&proposal_template()).unwrap();
    let deck = generator()
        .generate_package(package, &project_data(vec![]), &GenerationOptions::default(), None)
        .unwrap();

    let output = Package::from_bytes(&deck.bytes).unwrap();
    let cover = output.read_text("ppt/slides/slide1.xml").unwrap();
    assert!(cover.contains("AOI 技术方案"));
    assert!(cover.contains("Acme"));
    assert!(deck.report.replaced_fields >= 2);
    assert!(deck.report.available_fields.iter().any(|f| f == "project_name"));
    assert_eq!(deck.report.unresolved_placeholders, vec!["workstation_name".to_string()]);
    assert_eq!(deck.file_name, "AOI.pptx");
}

#[test]
fn test_duplicate_per_workstation() {
    let package = Package::from_bytes(&proposal_template()).unwrap();
    let data = project_data(vec![workstation("OP10"), workstation("OP20"), workstation("OP30")]);
    let options = GenerationOptions { duplicate_per_workstation: true, ..Default::default() };

    let deck = generator().generate_package(package, &data, &options, None).unwrap();
    assert_eq!(deck.report.slide_count, 17);
    assert_eq!(deck.report.generated_slides, 12);
    assert_eq!(deck.report.slides.len(), 17);
    assert_eq!(deck.report.slides[5].role, SlideRole::BasicInfo);
    assert_eq!(deck.report.slides[16].role, SlideRole::OpticalSolution);

    let output = Package::from_bytes(&deck.bytes).unwrap();
    let paths = output.slide_paths();
    assert_eq!(paths.len(), 17);
    assert_eq!(paths[16], "ppt/slides/slide17.xml");

    // Copies are grouped by workstation, templates in deck order inside each group.
    for (group, name) in ["OP10", "OP20", "OP30"].iter().enumerate() {
        for (offset, heading) in ["基本信息", "检测要求", "三视图", "光学方案"].iter().enumerate() {
            let path = format!("ppt/slides/slide{}.xml", 6 + group * 4 + offset);
            let xml = output.read_text(&path).unwrap();
            assert!(xml.contains(name), "{path} should mention {name}");
            assert!(xml.contains(heading), "{path} should be a copy of '{heading}'");
            assert!(!xml.contains("{{workstation_name}}"));
        }
    }

    let presentation = output.read_text("ppt/presentation.xml").unwrap();
    let ids: Vec<&str> = Regex::new(r#"<p:sldId id="(\d+)""#)
        .unwrap()
        .captures_iter(&presentation)
        .map(|c| c.get(1).unwrap().as_str())
        .collect();
    assert_eq!(ids.len(), 17);
    assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 17);

    let pres_rels = output.read_text("ppt/_rels/presentation.xml.rels").unwrap();
    assert!(pres_rels.contains(r#"Target="slides/slide17.xml""#));
    let content_types = output.read_text("[Content_Types].xml").unwrap();
    assert!(content_types.contains(r#"PartName="/ppt/slides/slide17.xml""#));
    assert!(output.contains("ppt/slides/_rels/slide17.xml.rels"));
}

#[test]
fn test_role_override_excludes_slide_from_replication() {
    let package = Package::from_bytes(&proposal_template()).unwrap();
    let data = project_data(vec![workstation("OP10"), workstation("OP20")]);
    let mut options = GenerationOptions { duplicate_per_workstation: true, ..Default::default() };
    options.role_overrides.insert(4, SlideRole::ThankYou);

    let deck = generator().generate_package(package, &data, &options, None).unwrap();
    assert_eq!(deck.report.generated_slides, 6);
    assert_eq!(deck.report.slide_count, 11);
    assert_eq!(deck.report.slides[4].role, SlideRole::ThankYou);
}

#[test]
fn test_images_are_embedded_with_valid_relationships() {
    let template = build_deck(&[
        simple_slide(&["{{project_name}} 技术方案"]),
        slide_xml(&[text_shape(2, &["{{img:front_view}}"]), text_shape(3, &["{{img:top_view}}"])]),
        slide_xml(&[text_shape(2, &["{{img:front_view}}"])]),
    ]);
    let mut ws = workstation("OP10");
    ws.layout = Some(Layout {
        front_view_url: "https://img.test/front.png".into(),
        top_view_url: "https://img.test/top".into(),
        ..Default::default()
    });
    let fetcher = StubFetcher::default()
        .with("https://img.test/front.png", png(40, 20), Some("image/png"))
        .with("https://img.test/top", jpeg(20, 40), None);

    let generator = generator().with_fetcher(fetcher);
    let deck = generator
        .generate_package(
            Package::from_bytes(&template).unwrap(),
            &project_data(vec![ws]),
            &GenerationOptions::default(),
            None,
        )
        .unwrap();
    assert_eq!(deck.report.images_injected, 3);

    let output = Package::from_bytes(&deck.bytes).unwrap();
    let embed = Regex::new(r#"r:embed="(rId\d+)""#).unwrap();
    let relationship = Regex::new(r#"Id="(rId\d+)"[^>]*Target="([^"]+)""#).unwrap();

    for n in [2, 3] {
        let xml = output.read_text(&format!("ppt/slides/slide{n}.xml")).unwrap();
        assert!(!xml.contains("{{img:"));
        assert!(xml.contains("<p:pic>"));

        let rels = output.read_text(&format!("ppt/slides/_rels/slide{n}.xml.rels")).unwrap();
        let targets: Vec<(String, String)> = relationship
            .captures_iter(&rels)
            .map(|c| (c[1].to_string(), c[2].to_string()))
            .collect();
        let unique: HashSet<&String> = targets.iter().map(|(id, _)| id).collect();
        assert_eq!(unique.len(), targets.len(), "duplicate relationship id in slide{n}");

        for caps in embed.captures_iter(&xml) {
            let (_, target) = targets
                .iter()
                .find(|(id, _)| id == &caps[1])
                .unwrap_or_else(|| panic!("{} has no relationship in slide{n}", &caps[1]));
            let part = format!("ppt/{}", target.trim_start_matches("../"));
            assert!(output.contains(&part), "missing media part {part}");
        }
    }

    let content_types = output.read_text("[Content_Types].xml").unwrap();
    assert!(content_types.contains(r#"Extension="png""#));
    assert!(content_types.contains(r#"Extension="jpeg""#));
    assert!(output.part_names().any(|p| p.starts_with("ppt/media/") && p.ends_with(".jpeg")));
}

#[test]
fn test_each_module_block_shows_its_own_schematic() {
    // The block body closes the opening shape, holds a whole image shape and
    // reopens a text shape, so each copy is a complete shape of its own.
    let opening = text_shape(2, &["{{#modules}}BODY{{/modules}}"]);
    let reopen = text_shape(4, &["TEXT"]);
    let (reopen_head, _) = reopen.split_once("TEXT").unwrap();
    let (_, opening_tail) = opening.split_once("BODY").unwrap();
    let opening_tail = opening_tail.trim_start_matches("{{/modules}}");
    let body = format!("{opening_tail}{}{reopen_head}", text_shape(3, &["{{img:module_schematic}}"]));
    let template = build_deck(&[slide_xml(&[opening.replace("BODY", &body)])]);

    let mut ws = workstation("OP10");
    ws.modules = vec![
        Module { name: "Scan".into(), schematic_url: "https://img.test/scan.png".into(), ..Default::default() },
        Module { name: "Glue".into(), schematic_url: "https://img.test/glue.png".into(), ..Default::default() },
    ];
    let fetcher = StubFetcher::default()
        .with("https://img.test/scan.png", png(40, 20), Some("image/png"))
        .with("https://img.test/glue.png", png(20, 40), Some("image/png"));

    let deck = generator()
        .with_fetcher(fetcher)
        .generate_package(
            Package::from_bytes(&template).unwrap(),
            &project_data(vec![ws]),
            &GenerationOptions::default(),
            None,
        )
        .unwrap();
    assert_eq!(deck.report.images_injected, 2);

    let output = Package::from_bytes(&deck.bytes).unwrap();
    let xml = output.read_text("ppt/slides/slide1.xml").unwrap();
    assert!(!xml.contains("{{"));
    assert_eq!(xml.matches("<p:pic>").count(), 2);
    roxmltree::Document::parse(&xml).unwrap();

    let rels = output.read_text("ppt/slides/_rels/slide1.xml.rels").unwrap();
    let media = Regex::new(r#"Target="\.\./media/([^"]+)""#).unwrap();
    let targets: HashSet<String> = media.captures_iter(&rels).map(|c| c[1].to_string()).collect();
    assert_eq!(targets.len(), 2);
    let blobs: HashSet<Vec<u8>> =
        targets.iter().map(|t| output.read(&format!("ppt/media/{t}")).unwrap().to_vec()).collect();
    assert_eq!(blobs.len(), 2, "both modules point at the same image");
}

#[test]
fn test_every_available_field_is_substituted() {
    let mut data = project_data(vec![workstation("OP10")]);
    data.project.customer = "A&B <Co>".into();

    let seed_slide = simple_slide(&["{{project_name}}"]);
    let first = generator()
        .generate_package(
            Package::from_bytes(&build_deck(&[seed_slide])).unwrap(),
            &data,
            &GenerationOptions::default(),
            None,
        )
        .unwrap();
    let names = first.report.available_fields;
    assert!(names.contains(&"generated_at".to_string()));

    let paragraphs: Vec<String> = names.iter().map(|n| format!("{n}={{{{{n}}}}}")).collect();
    let paragraphs: Vec<&str> = paragraphs.iter().map(String::as_str).collect();
    let template = build_deck(&[simple_slide(&paragraphs)]);

    let deck = generator()
        .generate_package(Package::from_bytes(&template).unwrap(), &data, &GenerationOptions::default(), None)
        .unwrap();
    assert!(deck.report.unresolved_placeholders.is_empty());
    assert!(deck.report.replaced_fields >= names.len());

    let xml = Package::from_bytes(&deck.bytes).unwrap().read_text("ppt/slides/slide1.xml").unwrap();
    assert!(!xml.contains("{{"));
    assert!(xml.contains("customer=A&amp;B &lt;Co&gt;"));
    assert!(xml.contains("project_name=AOI"));
    assert!(xml.contains("date=2024-05-20"));
    assert!(xml.contains("date_cn=2024年05月20日"));
    assert!(xml.contains("workstation_count=1"));
}

#[test]
fn test_generate_request_and_store() {
    let fetcher = StubFetcher::default().with(TEMPLATE_URL, proposal_template(), None);
    let generator = generator().with_fetcher(fetcher);
    let request = GenerationRequest::from_json(&format!(
        r#"{{
            "template": {{"url": "{TEMPLATE_URL}"}},
            "data": {{"project": {{"name": "AOI", "customer": "Acme"}}, "workstations": [{{"name": "OP10"}}]}},
            "options": {{"duplicate_per_workstation": true}},
            "file_name": "AOI 方案.pptx"
        }}"#
    ))
    .unwrap();

    let dir = tempdir().unwrap();
    let store = DirectoryStore::new(dir.path());
    let (deck, location) = generator.generate_and_store(&request, &store).unwrap();

    assert_eq!(deck.file_name, "AOI_方案.pptx");
    assert!(location.ends_with("AOI_方案.pptx"));
    let stored = Package::from_bytes(&fs::read(&location).unwrap()).unwrap();
    assert_eq!(stored.slide_paths().len(), 9);
}

#[test]
fn test_stored_template_resolves_against_base_url() {
    let fetcher = StubFetcher::default().with("https://files.test/templates/t-1", proposal_template(), None);
    let config = GeneratorConfig::builder().template_base_url("https://files.test/templates/").build();
    let generator = Generator::new(config).with_fetcher(fetcher);

    let slides = generator
        .analyze_template(&TemplateSource::Stored { id: "t-1".into() }, &GenerationOptions::default())
        .unwrap();
    assert_eq!(slides.len(), 5);
    assert_eq!(slides[2].role, SlideRole::TechnicalRequirements);
    assert!(slides[1].placeholders.contains(&"workstation_name".to_string()));
}

#[test]
fn test_strict_mode_rejects_unresolved_placeholders() {
    let template = build_deck(&[simple_slide(&["{{project_name}}", "{{not_a_field}}"])]);
    let generator = Generator::new(GeneratorConfig::builder().strict_placeholders(true).build());

    let err = generator
        .generate_package(
            Package::from_bytes(&template).unwrap(),
            &project_data(vec![]),
            &GenerationOptions::default(),
            None,
        )
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Generation);
    match err {
        Error::UnresolvedPlaceholders(names) => assert_eq!(names, vec!["not_a_field".to_string()]),
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn test_error_categories() {
    let fetcher = StubFetcher::default().with("https://files.test/not-a-deck", b"plain text".to_vec(), None);
    let generator = generator().with_fetcher(fetcher);

    let missing = GenerationRequest {
        template: TemplateSource::Url { url: "https://files.test/missing.pptx".into() },
        data: GenerationData::default(),
        options: GenerationOptions::default(),
        file_name: None,
    };
    assert_eq!(generator.generate(&missing).unwrap_err().category(), ErrorCategory::Download);

    let corrupt = GenerationRequest {
        template: TemplateSource::Url { url: "https://files.test/not-a-deck".into() },
        ..missing.clone()
    };
    assert_eq!(generator.generate(&corrupt).unwrap_err().category(), ErrorCategory::Archive);

    // No base URL configured for stored templates.
    let stored = GenerationRequest { template: TemplateSource::Stored { id: "t-1".into() }, ..missing };
    assert_eq!(generator.generate(&stored).unwrap_err().category(), ErrorCategory::Input);
}

#[test]
fn test_preview_styles() {
    let fetcher = StubFetcher::default().with(TEMPLATE_URL, proposal_template(), None);
    let generator = generator().with_fetcher(fetcher);

    let styles = generator.preview_styles(&TemplateSource::Url { url: TEMPLATE_URL.into() }).unwrap();
    assert_eq!(styles.theme_colors.len(), 12);
    assert_eq!(styles.slide_size, (12_192_000, 6_858_000));
    assert_eq!(styles.layouts.len(), 1);
    assert!(styles.logo.is_some());
}
