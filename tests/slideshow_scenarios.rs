//! End-to-end slideshow behaviour over real files: scan, navigate, decode,
//! skip broken slides. Everything runs without a window.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use image::{Rgb, RgbImage};
use rust_slideshow::catalog::{self, ScanOptions};
use rust_slideshow::config::Configuration;
use rust_slideshow::controller::{Command, ControlButton, Effect, Event, Key, Slideshow};
use rust_slideshow::loader::{FitPolicy, decode_fitted};
use rust_slideshow::playback::Mode;

fn write_image(path: &Path, w: u32, h: u32) {
    RgbImage::from_pixel(w, h, Rgb([40, 80, 120]))
        .save(path)
        .unwrap();
}

fn three_image_folder() -> (tempfile::TempDir, PathBuf) {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("holiday");
    fs::create_dir_all(&root).unwrap();
    write_image(&root.join("a.jpg"), 64, 48);
    write_image(&root.join("b.png"), 48, 64);
    write_image(&root.join("c.gif"), 32, 32);
    (tmp, root)
}

fn config() -> Configuration {
    Configuration {
        shuffle_seed: Some(11),
        ..Configuration::default()
    }
}

fn file_name(show: &Slideshow) -> Option<String> {
    show.current_image().map(|p| {
        p.as_path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned()
    })
}

/// Decode what the controller wants on screen and report the outcome back,
/// the way the event loop does.
fn display(show: &mut Slideshow, now: Instant) -> Effect {
    let Some(path) = show.current_image().map(|p| p.as_path().to_path_buf()) else {
        return Effect::None;
    };
    match decode_fitted(&path, (320, 240), FitPolicy::default()) {
        Ok(image) => show.handle(Event::Shown(image.path), now),
        Err(err) => {
            assert_eq!(err.path(), Some(path.as_path()));
            show.handle(Event::DecodeFailed(path), now)
        }
    }
}

#[test]
fn right_arrow_walks_and_wraps_over_real_folder() {
    let (_tmp, root) = three_image_folder();
    let catalog = catalog::build(&[root], &ScanOptions::default());
    assert_eq!(catalog.len(), 3);

    let t0 = Instant::now();
    let mut show = Slideshow::new(catalog, &config(), t0);
    assert_eq!(file_name(&show).as_deref(), Some("a.jpg"));
    assert_eq!(show.status().line(), "Image 1/3 | Folder: holiday | Auto [ON]");

    let mut seen = Vec::new();
    for _ in 0..3 {
        assert_eq!(show.handle(Event::Key(Key::Right), t0), Effect::Show);
        assert_eq!(display(&mut show, t0), Effect::None);
        seen.push(file_name(&show).unwrap());
    }
    assert_eq!(seen, vec!["b.png", "c.gif", "a.jpg"]);
}

#[test]
fn deleted_file_is_skipped_forward() {
    let (_tmp, root) = three_image_folder();
    let catalog = catalog::build(&[root.clone()], &ScanOptions::default());
    fs::remove_file(root.join("b.png")).unwrap();

    let t0 = Instant::now();
    let mut show = Slideshow::new(catalog, &config(), t0);
    display(&mut show, t0);
    show.handle(Event::Key(Key::Right), t0);
    assert_eq!(file_name(&show).as_deref(), Some("b.png"));
    assert_eq!(display(&mut show, t0), Effect::Show);
    assert_eq!(file_name(&show).as_deref(), Some("c.gif"));
    assert_eq!(display(&mut show, t0), Effect::None);
}

#[test]
fn corrupt_file_skipped_backward_after_previous() {
    let (_tmp, root) = three_image_folder();
    fs::write(root.join("c.gif"), b"definitely not a gif").unwrap();
    let catalog = catalog::build(&[root], &ScanOptions::default());

    let t0 = Instant::now();
    let mut show = Slideshow::new(catalog, &config(), t0);
    show.handle(Event::Key(Key::Left), t0);
    assert_eq!(file_name(&show).as_deref(), Some("c.gif"));
    assert_eq!(display(&mut show, t0), Effect::Show);
    assert_eq!(file_name(&show).as_deref(), Some("b.png"));
}

#[test]
fn folder_of_broken_files_stops_with_nothing_displayable() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("x.jpg"), b"junk").unwrap();
    fs::write(tmp.path().join("y.png"), b"junk").unwrap();
    let catalog = catalog::build(&[tmp.path().to_path_buf()], &ScanOptions::default());

    let t0 = Instant::now();
    let mut show = Slideshow::new(catalog, &config(), t0);
    assert_eq!(display(&mut show, t0), Effect::Show);
    assert_eq!(display(&mut show, t0), Effect::Refresh);
    assert!(show.is_exhausted());
    assert!(show.current_image().is_none());
    assert_eq!(show.next_deadline(), None);
}

#[test]
fn empty_folder_never_advances() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("notes.txt"), b"hello").unwrap();
    let catalog = catalog::build(&[tmp.path().to_path_buf()], &ScanOptions::default());
    assert!(catalog.is_empty());

    let t0 = Instant::now();
    let mut show = Slideshow::new(catalog, &config(), t0);
    assert_eq!(show.handle(Event::Key(Key::Right), t0), Effect::None);
    assert_eq!(show.handle(Event::Tick, t0 + Duration::from_secs(60)), Effect::None);
    assert_eq!(show.apply(Command::ToggleMode, t0), Effect::Refresh);
    assert!(show.current_image().is_none());
}

#[test]
fn random_mode_visits_every_image_once_per_cycle() {
    let tmp = tempfile::tempdir().unwrap();
    for i in 0..12 {
        fs::write(tmp.path().join(format!("{i:02}.jpg")), b"x").unwrap();
    }
    let catalog = catalog::build(&[tmp.path().to_path_buf()], &ScanOptions::default());
    let t0 = Instant::now();
    let mut show = Slideshow::new(catalog, &config(), t0);
    show.handle(Event::Key(Key::R), t0);
    assert_eq!(show.state().mode(), Mode::Random);

    let mut visited = vec![file_name(&show).unwrap()];
    for _ in 1..12 {
        show.apply(Command::Next, t0);
        visited.push(file_name(&show).unwrap());
    }
    visited.sort();
    let expected: Vec<String> = (0..12).map(|i| format!("{i:02}.jpg")).collect();
    assert_eq!(visited, expected);
}

#[test]
fn button_bar_drives_the_same_transitions_as_keys() {
    let (_tmp, root) = three_image_folder();
    let catalog = catalog::build(&[root], &ScanOptions::default());
    let t0 = Instant::now();
    let mut show = Slideshow::new(catalog, &config(), t0);

    show.handle(Event::PointerMoved, t0);
    assert!(show.controls_visible(t0));
    assert_eq!(
        show.handle(Event::Click(Some(ControlButton::Pause)), t0),
        Effect::Refresh
    );
    assert!(show.state().is_paused());
    assert!(show.status().line().contains("[PAUSED]"));
    assert_eq!(
        show.handle(Event::Click(Some(ControlButton::Fullscreen)), t0),
        Effect::SetFullscreen(false)
    );
    assert_eq!(
        show.handle(Event::Click(Some(ControlButton::Quit)), t0),
        Effect::Exit
    );
}

#[test]
fn windowed_escape_quits_immediately() {
    let (_tmp, root) = three_image_folder();
    let catalog = catalog::build(&[root], &ScanOptions::default());
    let cfg = Configuration {
        start_fullscreen: false,
        ..config()
    };
    let t0 = Instant::now();
    let mut show = Slideshow::new(catalog, &cfg, t0);
    assert_eq!(show.handle(Event::Key(Key::Escape), t0), Effect::Exit);
}

#[test]
fn auto_advance_disabled_by_config_keeps_slide() {
    let (_tmp, root) = three_image_folder();
    let catalog = catalog::build(&[root], &ScanOptions::default());
    let cfg = Configuration {
        auto_advance: false,
        ..config()
    };
    let t0 = Instant::now();
    let mut show = Slideshow::new(catalog, &cfg, t0);
    assert_eq!(show.handle(Event::Tick, t0 + Duration::from_secs(30)), Effect::None);
    assert_eq!(file_name(&show).as_deref(), Some("a.jpg"));
    assert!(show.status().line().ends_with("Auto [OFF]"));
}
