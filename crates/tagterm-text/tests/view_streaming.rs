//! Streaming text into a view from other threads while drawing it.

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use tagterm_render::buffer::Buffer;
use tagterm_render::geometry::Rect;
use tagterm_text::{TextView, ViewConfig, translate_stream};

fn rows(buf: &Buffer) -> Vec<String> {
    (0..buf.height()).map(|y| buf.row_text(y)).collect()
}

#[test]
fn producers_and_drawer_share_the_view() {
    let view = TextView::new();
    view.set_dynamic_colors(true);
    thread::scope(|s| {
        for producer in 0..4 {
            let view = &view;
            s.spawn(move || {
                let mut writer = view;
                for i in 0..50 {
                    // One write per line so lines from different producers never interleave.
                    let line = format!("[yellow]p{producer}[-] {i}\n");
                    writer.write_all(line.as_bytes()).unwrap();
                }
            });
        }
        s.spawn(|| {
            let mut buf = Buffer::new(20, 5);
            for _ in 0..50 {
                view.draw(&mut buf, Rect::from_size(20, 5));
            }
        });
    });

    let lines = view.lines();
    // 200 complete lines plus the empty line after the last newline.
    assert_eq!(lines.len(), 201);
    assert_eq!(lines.last().map(String::as_str), Some(""));
    for producer in 0..4 {
        let tag = format!("[yellow]p{producer}[-] ");
        assert_eq!(lines.iter().filter(|l| l.starts_with(&tag)).count(), 50);
    }
}

#[test]
fn changed_fn_counts_every_write() {
    let calls = Arc::new(AtomicUsize::new(0));
    let view = TextView::new();
    let counter = Arc::clone(&calls);
    view.set_changed_fn(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    thread::scope(|s| {
        for _ in 0..3 {
            s.spawn(|| {
                let mut writer = &view;
                for _ in 0..10 {
                    writer.write_all(b"x").unwrap();
                }
            });
        }
    });
    assert_eq!(calls.load(Ordering::SeqCst), 30);
    assert_eq!(view.lines(), vec!["x".repeat(30)]);
}

#[test]
fn tail_follows_a_growing_log() {
    let view = TextView::new();
    let mut buf = Buffer::new(8, 3);
    view.draw(&mut buf, Rect::from_size(8, 3));

    let mut writer = &view;
    for i in 0..10 {
        writeln!(writer, "entry {i}").unwrap();
        buf.clear();
        view.draw(&mut buf, Rect::from_size(8, 3));
    }
    assert_eq!(rows(&buf), vec!["entry 8 ", "entry 9 ", "        "]);
}

#[test]
fn bounded_view_keeps_only_what_is_visible() {
    let view = TextView::with_config(ViewConfig::default().scrollable(false));
    let mut buf = Buffer::new(6, 2);
    let mut writer = &view;
    for i in 0..100 {
        writeln!(writer, "row{i}").unwrap();
        view.draw(&mut buf, Rect::from_size(6, 2));
    }
    assert!(view.lines().len() <= 3);
    assert_eq!(rows(&buf), vec!["row99 ", "      "]);
}

#[test]
fn ansi_bytes_split_anywhere() {
    let input = "\x1b[1;31merror\x1b[0m: 漢字 \x1b[38;5;46mok\x1b[m\n";
    let bytes = input.as_bytes();
    let expected = {
        let view = TextView::new();
        translate_stream(&view).write_all(bytes).unwrap();
        view.lines()
    };
    for cut in 0..=bytes.len() {
        let view = TextView::new();
        let mut writer = translate_stream(&view);
        writer.write_all(&bytes[..cut]).unwrap();
        writer.write_all(&bytes[cut..]).unwrap();
        assert_eq!(view.lines(), expected, "split at {cut}");
    }
    assert_eq!(expected[0], "[red::b]error[-:-:-]: 漢字 [#00ff00]ok[-:-:-]");
}
