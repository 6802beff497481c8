//! Fixed interpretation and manifestation type hierarchy.
//!
//! Templates that name a parent type also match every registered descendant,
//! so a template for [`interpretation::DOCUMENT`] matches spreadsheets and
//! presentations as well.
//!
//! # Example
//!
//! ```ignore
//! use tempora_core::ontology::{self, interpretation};
//!
//! let expanded = ontology::global().expand(interpretation::DOCUMENT);
//! assert!(expanded.iter().any(|uri| uri == interpretation::SPREADSHEET));
//! ```

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Interpretation URIs (what an event or subject *is*).
pub mod interpretation {
    #![allow(missing_docs)]

    macro_rules! zg {
        ($name:literal) => {
            concat!("http://www.zeitgeist-project.com/ontologies/2010/01/27/zg#", $name)
        };
    }
    macro_rules! nfo {
        ($name:literal) => {
            concat!("http://www.semanticdesktop.org/ontologies/2007/03/22/nfo#", $name)
        };
    }

    pub const EVENT_INTERPRETATION: &str = zg!("EventInterpretation");
    pub const ACCESS_EVENT: &str = zg!("AccessEvent");
    pub const LEAVE_EVENT: &str = zg!("LeaveEvent");
    pub const CREATE_EVENT: &str = zg!("CreateEvent");
    pub const MODIFY_EVENT: &str = zg!("ModifyEvent");
    pub const DELETE_EVENT: &str = zg!("DeleteEvent");
    pub const MOVE_EVENT: &str = zg!("MoveEvent");
    pub const RECEIVE_EVENT: &str = zg!("ReceiveEvent");
    pub const SEND_EVENT: &str = zg!("SendEvent");
    pub const ACCEPT_EVENT: &str = zg!("AcceptEvent");
    pub const DENY_EVENT: &str = zg!("DenyEvent");
    pub const EXPIRE_EVENT: &str = zg!("ExpireEvent");

    pub const DOCUMENT: &str = nfo!("Document");
    pub const TEXT_DOCUMENT: &str = nfo!("TextDocument");
    pub const PLAIN_TEXT_DOCUMENT: &str = nfo!("PlainTextDocument");
    pub const SOURCE_CODE: &str = nfo!("SourceCode");
    pub const PAGINATED_TEXT_DOCUMENT: &str = nfo!("PaginatedTextDocument");
    pub const HTML_DOCUMENT: &str = nfo!("HtmlDocument");
    pub const SPREADSHEET: &str = nfo!("Spreadsheet");
    pub const PRESENTATION: &str = nfo!("Presentation");
    pub const MIND_MAP: &str = nfo!("MindMap");

    pub const MEDIA: &str = nfo!("Media");
    pub const AUDIO: &str = nfo!("Audio");
    pub const MUSIC_PIECE: &str = nfo!("MusicPiece");
    pub const VISUAL: &str = nfo!("Visual");
    pub const IMAGE: &str = nfo!("Image");
    pub const RASTER_IMAGE: &str = nfo!("RasterImage");
    pub const VECTOR_IMAGE: &str = nfo!("VectorImage");
    pub const VIDEO: &str = nfo!("Video");

    pub const SOFTWARE: &str = nfo!("Software");
    pub const APPLICATION: &str = nfo!("Application");
    pub const WEBSITE: &str = nfo!("Website");
    pub const FOLDER: &str = nfo!("Folder");
}

/// Manifestation URIs (how an event happened or a subject exists).
pub mod manifestation {
    #![allow(missing_docs)]

    macro_rules! zg {
        ($name:literal) => {
            concat!("http://www.zeitgeist-project.com/ontologies/2010/01/27/zg#", $name)
        };
    }
    macro_rules! nfo {
        ($name:literal) => {
            concat!("http://www.semanticdesktop.org/ontologies/2007/03/22/nfo#", $name)
        };
    }

    pub const EVENT_MANIFESTATION: &str = zg!("EventManifestation");
    pub const USER_ACTIVITY: &str = zg!("UserActivity");
    pub const HEURISTIC_ACTIVITY: &str = zg!("HeuristicActivity");
    pub const SCHEDULED_ACTIVITY: &str = zg!("ScheduledActivity");
    pub const SYSTEM_NOTIFICATION: &str = zg!("SystemNotification");
    pub const WORLD_ACTIVITY: &str = zg!("WorldActivity");

    pub const FILE_DATA_OBJECT: &str = nfo!("FileDataObject");
    pub const REMOTE_DATA_OBJECT: &str = nfo!("RemoteDataObject");
    pub const DELETED_RESOURCE: &str = nfo!("DeletedResource");
    pub const WEB_DATA_OBJECT: &str = nfo!("WebDataObject");
    pub const SOFTWARE_SERVICE: &str = nfo!("SoftwareService");
    pub const MEDIA_STREAM: &str = nfo!("MediaStream");
}

/// Interpretation marking an event that moved its subject to `current_uri`.
pub const MOVE_EVENT: &str = interpretation::MOVE_EVENT;

/// Parent → direct children edges of the hierarchy.
const EDGES: &[(&str, &[&str])] = {
    use interpretation as i;
    use manifestation as m;
    &[
        (
            i::EVENT_INTERPRETATION,
            &[
                i::ACCESS_EVENT,
                i::LEAVE_EVENT,
                i::CREATE_EVENT,
                i::MODIFY_EVENT,
                i::DELETE_EVENT,
                i::MOVE_EVENT,
                i::RECEIVE_EVENT,
                i::SEND_EVENT,
                i::ACCEPT_EVENT,
                i::DENY_EVENT,
                i::EXPIRE_EVENT,
            ],
        ),
        (
            i::DOCUMENT,
            &[i::TEXT_DOCUMENT, i::SPREADSHEET, i::PRESENTATION, i::MIND_MAP],
        ),
        (
            i::TEXT_DOCUMENT,
            &[
                i::PLAIN_TEXT_DOCUMENT,
                i::PAGINATED_TEXT_DOCUMENT,
                i::HTML_DOCUMENT,
            ],
        ),
        (i::PLAIN_TEXT_DOCUMENT, &[i::SOURCE_CODE]),
        (i::MEDIA, &[i::AUDIO, i::VISUAL]),
        (i::AUDIO, &[i::MUSIC_PIECE]),
        (i::VISUAL, &[i::IMAGE, i::VIDEO]),
        (i::IMAGE, &[i::RASTER_IMAGE, i::VECTOR_IMAGE]),
        (i::SOFTWARE, &[i::APPLICATION]),
        (
            m::EVENT_MANIFESTATION,
            &[
                m::USER_ACTIVITY,
                m::HEURISTIC_ACTIVITY,
                m::SCHEDULED_ACTIVITY,
                m::SYSTEM_NOTIFICATION,
                m::WORLD_ACTIVITY,
            ],
        ),
        (
            m::FILE_DATA_OBJECT,
            &[m::REMOTE_DATA_OBJECT, m::DELETED_RESOURCE],
        ),
    ]
};

static GLOBAL: Lazy<Ontology> = Lazy::new(Ontology::builtin);

/// The built-in hierarchy.
pub fn global() -> &'static Ontology {
    &GLOBAL
}

/// A parent → children type hierarchy.
#[derive(Debug, Clone, Default)]
pub struct Ontology {
    children: HashMap<&'static str, Vec<&'static str>>,
}

impl Ontology {
    fn builtin() -> Self {
        let mut children: HashMap<&'static str, Vec<&'static str>> = HashMap::new();
        for (parent, kids) in EDGES {
            children.entry(*parent).or_default().extend_from_slice(kids);
        }
        Ontology { children }
    }

    /// Direct children of `uri`. Unknown URIs have none.
    pub fn children(&self, uri: &str) -> &[&'static str] {
        self.children.get(uri).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All transitive descendants of `uri`, without `uri` itself.
    pub fn descendants(&self, uri: &str) -> Vec<&'static str> {
        let mut out: Vec<&'static str> = Vec::new();
        let mut queue: Vec<&str> = vec![uri];
        while let Some(current) = queue.pop() {
            for &child in self.children(current) {
                if !out.contains(&child) {
                    out.push(child);
                    queue.push(child);
                }
            }
        }
        out
    }

    /// `uri` followed by all of its descendants.
    pub fn expand(&self, uri: &str) -> Vec<String> {
        let mut out = vec![uri.to_string()];
        out.extend(self.descendants(uri).into_iter().map(str::to_string));
        out
    }

    /// True if `uri` equals `ancestor` or descends from it.
    pub fn is_a(&self, uri: &str, ancestor: &str) -> bool {
        uri == ancestor || self.descendants(ancestor).iter().any(|d| *d == uri)
    }
}
