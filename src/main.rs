use log::*;

use roadway::app::{self, App, BackgroundUpdates, UpdateTime};
use roadway::config;
use roadway::document::Document;

fn main() {
    // Init logging
    simple_logging::log_to_stderr(log::LevelFilter::Info);
    info!("Starting {} v{}.", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    // User config not directly related to model state.
    let config = config::Config::load();
    let background_jobs = app::BackgroundJobs::new();

    // Open the document given on the command line, or an empty,
    // untitled one.
    let document = match std::env::args().nth(1) {
        Some(filename) => {
            match Document::load(&filename, &config, background_jobs.clone()) {
                Ok(d) => d,
                Err(e) => {
                    error!("Could not load {:?}: {}", filename, e);
                    std::process::exit(1);
                },
            }
        },
        None => Document::empty(&config, background_jobs.clone()),
    };
    let mut app = App { document, config, background_jobs };
    let document = &mut app.document;

    // Wait for the background derivation of render geometry.
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    loop {
        document.check();
        let gen = document.analysis.generation();
        if document.analysis.output.geometry.as_ref().map(|(g,_)| *g == gen).unwrap_or(false) {
            break;
        }
        if std::time::Instant::now() > deadline {
            warn!("Timed out waiting for render geometry.");
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(10));
    }

    let has_actors = {
        let model = document.analysis.model();
        info!("{}: {} roads, {} junctions, {} actors.",
              document.fileinfo.window_title(),
              model.roads.len(), model.junctions.len(), model.actors.len());
        !model.actors.is_empty()
    };

    // Headless scenario run, 10 seconds of scripted traffic.
    if has_actors {
        document.start_playback();
        for _ in 0..100 { document.advance(0.1); }
        if let Some(p) = &document.playback {
            for (id, state) in p.states.iter() {
                info!("Actor {} at ({:.1},{:.1}), speed {:.1}.",
                      id, state.pos.x, state.pos.y, state.speed);
            }
        }
        document.stop_playback();
    }

    info!("{}", document.analysis.undo_info());
}
