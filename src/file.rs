use crate::document::model::Model;
use std::fs::File;
use log::*;

pub fn load(filename :&str) -> Result<Model, std::io::Error> {
    info!("Loading document from {:?}", filename);
    let m = serde_cbor::from_reader(File::open(&filename)?)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    Ok(m)
}

pub fn save(filename :&str, m :&Model) -> Result<(), std::io::Error> {
    info!("Saving document to {:?}", filename);
    serde_cbor::to_writer(&File::create(filename)?, m)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    Ok(())
}

#[derive(Debug)]
#[derive(Clone)]
pub struct FileInfo {
    pub filename :Option<String>,
    pub unsaved :bool,
}

impl FileInfo {
    pub fn empty() -> Self {
        FileInfo {
            filename: None,
            unsaved: false,
        }
    }

    pub fn set_saved_file(&mut self, filename :String) {
        self.unsaved = false;
        self.filename = Some(filename);
    }

    pub fn set_saved(&mut self) {
        self.unsaved = false;
    }

    pub fn set_unsaved(&mut self) {
        self.unsaved = true;
    }

    pub fn window_title(&self) -> String {
        format!("{}{} - Roadway", if self.unsaved { "*" } else { "" },
                self.filename.as_ref().map(|x| x.as_str()).unwrap_or("Untitled"))
    }
}
