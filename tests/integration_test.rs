use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const CATALOG: &str = r#"[
  {"id": 1, "name": "Lay-up lijn", "description": "Twee rijen.\nAfwisselend links en rechts.",
   "ageGroup": "U12", "duration": 10, "equipment": ["Ballen"], "picture": "layup.png",
   "tags": ["Afwerken"], "intensity": 2},
  {"id": 2, "name": "Verdedigende slide", "description": "Laterale verplaatsing",
   "ageGroup": "U14", "duration": 5, "equipment": ["Kegels"], "picture": ["slide.png", "missing.png"],
   "tags": ["Verdediging"], "intensity": 3},
  {"id": 3, "name": "Drie tegen twee", "description": "Snelle overtal-aanval",
   "ageGroup": "U14", "duration": 15, "equipment": ["Ballen", "Hesjes"], "picture": [],
   "tags": ["Afwerken", "Spel"], "intensity": 3}
]"#;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(dir.path().join("drills.json"), CATALOG).expect("Failed to write catalog");

        let images = dir.path().join("images");
        fs::create_dir_all(&images).expect("Failed to create image dir");
        write_png(&images.join("layup.png"), 400, 300);
        write_png(&images.join("slide.png"), 300, 500);
        write_png(&images.join("basket.png"), 240, 100);

        Workspace { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn run(&self, args: &[&str]) -> Output {
        let data_dir = self.path().join("data");
        let catalog = self.path().join("drills.json");
        let images = self.path().join("images");
        Command::new(env!("CARGO_BIN_EXE_drillbook"))
            .arg("--data-dir")
            .arg(&data_dir)
            .arg("--catalog")
            .arg(&catalog)
            .arg("--images")
            .arg(&images)
            .args(args)
            .output()
            .expect("Failed to execute command")
    }

    fn run_ok(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(output.status.success(), "Command {:?} failed: {:?}", args, output);
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    fn save_session(&self, name: &str) -> String {
        let stdout = self.run_ok(&["session", "save", "--name", name]);
        stdout
            .lines()
            .find_map(|l| l.trim().strip_prefix("ID: "))
            .expect("No session id printed")
            .to_string()
    }
}

fn write_png(path: &Path, width: u32, height: u32) {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 90, 30]));
    img.save(path).expect("Failed to write png");
}

fn assert_pdf(path: &Path) {
    assert!(path.exists(), "PDF file was not created");
    let bytes = fs::read(path).expect("Failed to read PDF");
    assert!(bytes.starts_with(b"%PDF"), "Output is not a PDF");
    assert!(bytes.len() > 1000, "PDF file is too small, likely empty or corrupt");
}

fn pages_reported(stdout: &str) -> usize {
    stdout
        .lines()
        .find_map(|l| l.trim().strip_prefix("Pages: "))
        .and_then(|n| n.parse().ok())
        .expect("No page count printed")
}

#[test]
fn test_list_filters_and_sorts() {
    let ws = Workspace::new();

    let all = ws.run_ok(&["drills", "list"]);
    assert!(all.contains("3 of 3 drills"));

    let u14 = ws.run_ok(&["drills", "list", "--age-group", "U14", "--sort", "duration", "--desc"]);
    assert!(u14.contains("2 of 3 drills"));
    let three = u14.find("Drie tegen twee").expect("missing drill 3");
    let slide = u14.find("Verdedigende slide").expect("missing drill 2");
    assert!(three < slide, "expected longest drill first:\n{}", u14);

    let tagged = ws.run_ok(&["drills", "list", "--tag", "Afwerken", "--search", "lay"]);
    assert!(tagged.contains("1 of 3 drills"));
    assert!(tagged.contains("Lay-up lijn"));
}

#[test]
fn test_facets() {
    let ws = Workspace::new();
    let stdout = ws.run_ok(&["drills", "facets"]);
    assert!(stdout.contains("Age groups: U12, U14"));
    assert!(stdout.contains("Equipment: Ballen, Hesjes, Kegels"));
    assert!(stdout.contains("#ffffff on #43669e"), "first tag takes the first palette colour:\n{}", stdout);
}

#[test]
fn test_cart_add_move_and_show() {
    let ws = Workspace::new();

    ws.run_ok(&["cart", "add", "1", "2", "3"]);
    let again = ws.run_ok(&["cart", "add", "2"]);
    assert!(again.contains("Already in training"));

    ws.run_ok(&["cart", "move", "3", "1"]);
    let shown = ws.run_ok(&["cart", "show"]);
    let first = shown.find("Drie tegen twee").expect("missing drill 3");
    let second = shown.find("Lay-up lijn").expect("missing drill 1");
    assert!(first < second, "reorder not applied:\n{}", shown);
    assert!(shown.contains("Total: 30 minutes"));

    ws.run_ok(&["cart", "remove", "3"]);
    let shown = ws.run_ok(&["cart", "show"]);
    assert!(shown.contains("Total: 15 minutes"));
}

#[test]
fn test_unknown_drill_is_rejected() {
    let ws = Workspace::new();
    let output = ws.run(&["cart", "add", "99"]);
    assert!(!output.status.success(), "Should fail with unknown drill");
}

#[test]
fn test_session_save_share_and_delete() {
    let ws = Workspace::new();
    ws.run_ok(&["cart", "add", "1", "2"]);
    let id = ws.save_session("Dinsdag U14");

    let listed = ws.run_ok(&["session", "list"]);
    assert!(listed.contains(&id));
    assert!(listed.contains("Dinsdag U14"));

    let link = ws.run_ok(&["session", "share", &id]);
    assert!(link.trim().ends_with(&format!("/share/{}-dinsdag-u14", id)), "got {}", link);

    // Share links are accepted wherever an id is
    let shown = ws.run_ok(&["session", "show", link.trim()]);
    assert!(shown.contains("Lay-up lijn"));

    ws.run_ok(&["session", "delete", &id]);
    let listed = ws.run_ok(&["session", "list"]);
    assert!(listed.contains("No saved trainings"));

    let output = ws.run(&["session", "delete", &id]);
    assert!(!output.status.success(), "Deleting twice should fail");
}

#[test]
fn test_session_ids_increase() {
    let ws = Workspace::new();
    ws.run_ok(&["cart", "add", "1"]);
    let first: u64 = ws.save_session("Eerste").parse().expect("numeric id");
    let second: u64 = ws.save_session("Tweede").parse().expect("numeric id");
    assert!(second > first);
}

#[test]
fn test_edit_loads_session_into_cart() {
    let ws = Workspace::new();
    ws.run_ok(&["cart", "add", "3", "1"]);
    let id = ws.save_session("Donderdag");
    ws.run_ok(&["cart", "clear"]);

    ws.run_ok(&["session", "edit", &id]);
    let shown = ws.run_ok(&["cart", "show"]);
    assert!(shown.contains("Drie tegen twee"));
    assert!(shown.contains("Total: 25 minutes"));
}

#[test]
fn test_pdf_from_session() {
    let ws = Workspace::new();
    ws.run_ok(&["cart", "add", "1", "2", "3"]);
    let id = ws.save_session("Zaterdag Training");

    let output_file = ws.path().join("out").join("session.pdf");
    let stdout = ws.run_ok(&[
        "pdf",
        "--session",
        &id,
        "-o",
        output_file.to_str().expect("utf-8 path"),
    ]);

    assert!(stdout.contains("✓ Generated:"));
    assert!(stdout.contains("Drills: 3"));
    assert_eq!(pages_reported(&stdout), 1);
    assert_pdf(&output_file);
}

#[test]
fn test_pdf_cover_adds_a_page() {
    let ws = Workspace::new();
    ws.run_ok(&["cart", "add", "1", "2"]);
    let output_file = ws.path().join("cover.pdf");

    let stdout = ws.run_ok(&[
        "pdf",
        "--cart",
        "--cover",
        "-o",
        output_file.to_str().expect("utf-8 path"),
    ]);

    assert_eq!(pages_reported(&stdout), 2);
    assert_pdf(&output_file);
}

#[test]
fn test_pdf_default_filename_uses_session_name() {
    let ws = Workspace::new();
    ws.run_ok(&["cart", "add", "2"]);
    let id = ws.save_session("Vrijdag Jeugd");

    let output = Command::new(env!("CARGO_BIN_EXE_drillbook"))
        .current_dir(ws.path())
        .args(["--data-dir", "data", "--catalog", "drills.json", "--images", "images"])
        .args(["pdf", "--session", &id])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert_pdf(&ws.path().join("vrijdag-jeugd.pdf"));
}

#[test]
fn test_pdf_with_empty_cart_writes_nothing() {
    let ws = Workspace::new();
    let output_file = ws.path().join("empty.pdf");
    let stdout = ws.run_ok(&["pdf", "--cart", "-o", output_file.to_str().expect("utf-8 path")]);
    assert!(stdout.contains("No drills to export"));
    assert!(!output_file.exists());
}

#[test]
fn test_unknown_session() {
    let ws = Workspace::new();
    let output = ws.run(&["pdf", "--session", "12345"]);
    assert!(!output.status.success(), "Should fail with unknown session");
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error:"));
}

#[test]
fn test_missing_catalog() {
    let ws = Workspace::new();
    let output = Command::new(env!("CARGO_BIN_EXE_drillbook"))
        .arg("--data-dir")
        .arg(ws.path().join("data"))
        .arg("--catalog")
        .arg(ws.path().join("nope.json"))
        .args(["drills", "list"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success(), "Should fail with missing catalog");
}

#[test]
fn test_invalid_layout_config() {
    let ws = Workspace::new();
    let config = ws.path().join("bad.toml");
    fs::write(&config, "[layout]\nimage_column_width_mm = 500.0\n").expect("Failed to write config");

    let output = ws.run(&["--config", config.to_str().expect("utf-8 path"), "drills", "list"]);
    assert!(!output.status.success(), "Should fail with an impossible layout");
}
