use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// The three filesystem locations handed to the foreign initializer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnginePaths {
    pub app_data_dir: PathBuf,
    pub native_lib_dir: PathBuf,
    pub external_data_dir: PathBuf,
}

/// A node in the engine's configuration tree.
///
/// Passed by value across the foreign boundary in both directions; the
/// control layer never caches these, every read is a fresh round-trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawConfig {
    pub name: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub sub_items: Vec<RawConfig>,
}

impl RawConfig {
    /// Look up a direct child by name.
    pub fn get(&self, name: &str) -> Option<&RawConfig> {
        self.sub_items.iter().find(|c| c.name == name)
    }

    /// Descend through `/`-separated child names.
    pub fn get_path(&self, path: &str) -> Option<&RawConfig> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .try_fold(self, |node, name| node.get(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputMethodEntry {
    pub unique_name: String,
    pub name: String,
    pub icon: String,
    pub native_name: String,
    pub label: String,
    pub language_code: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonInfo {
    pub unique_name: String,
    pub name: String,
    #[serde(default)]
    pub comment: Option<String>,
    pub category: i32,
    pub enabled: bool,
}

/// Typed union over engine-originated notifications.
///
/// Produced only on the engine's callback thread by [`EngineEvent::decode`];
/// immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// Candidate list replaced (possibly by an empty one).
    CandidateList { candidates: Vec<String> },
    /// Text committed to the client.
    CommitString { text: String },
    /// Preedit updated: engine-side and client-side strings.
    Preedit {
        preedit: String,
        client_preedit: String,
    },
    /// Auxiliary up/down text on the input panel.
    InputPanelAux { aux_up: String, aux_down: String },
    /// The engine finished startup and accepts commands.
    Ready,
    /// Unrecognized tag or malformed payload, kept verbatim.
    Unknown { event_type: i32, params: Vec<Value> },
}

impl EngineEvent {
    /// Decode the raw `(type, params)` callback payload into a typed event.
    ///
    /// Malformed payloads never fail the callback thread; they fall back to
    /// [`EngineEvent::Unknown`] with the payload kept as-is.
    pub fn decode(event_type: i32, params: Vec<Value>) -> Self {
        fn str_at(params: &[Value], idx: usize) -> Option<String> {
            params.get(idx).and_then(Value::as_str).map(str::to_owned)
        }

        let decoded = match event_type {
            0 => params
                .iter()
                .map(|v| v.as_str().map(str::to_owned))
                .collect::<Option<Vec<String>>>()
                .map(|candidates| EngineEvent::CandidateList { candidates }),
            1 => str_at(&params, 0).map(|text| EngineEvent::CommitString { text }),
            2 => str_at(&params, 0).zip(str_at(&params, 1)).map(
                |(preedit, client_preedit)| EngineEvent::Preedit {
                    preedit,
                    client_preedit,
                },
            ),
            3 => str_at(&params, 0)
                .zip(str_at(&params, 1))
                .map(|(aux_up, aux_down)| EngineEvent::InputPanelAux { aux_up, aux_down }),
            4 => Some(EngineEvent::Ready),
            _ => None,
        };
        decoded.unwrap_or(EngineEvent::Unknown { event_type, params })
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, EngineEvent::Ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_candidate_list() {
        let ev = EngineEvent::decode(0, vec![json!("你"), json!("尼"), json!("泥")]);
        assert_eq!(
            ev,
            EngineEvent::CandidateList {
                candidates: vec!["你".into(), "尼".into(), "泥".into()]
            }
        );
    }

    #[test]
    fn decode_commit_and_preedit() {
        assert_eq!(
            EngineEvent::decode(1, vec![json!("好")]),
            EngineEvent::CommitString { text: "好".into() }
        );
        assert_eq!(
            EngineEvent::decode(2, vec![json!("ni hao"), json!("你好")]),
            EngineEvent::Preedit {
                preedit: "ni hao".into(),
                client_preedit: "你好".into()
            }
        );
    }

    #[test]
    fn decode_input_panel_aux() {
        assert_eq!(
            EngineEvent::decode(3, vec![json!("拼"), json!("1. 拼音")]),
            EngineEvent::InputPanelAux {
                aux_up: "拼".into(),
                aux_down: "1. 拼音".into()
            }
        );
    }

    #[test]
    fn decode_ready_ignores_params() {
        assert!(EngineEvent::decode(4, vec![]).is_ready());
        assert!(EngineEvent::decode(4, vec![json!(1)]).is_ready());
    }

    #[test]
    fn malformed_payload_falls_back_to_unknown() {
        let ev = EngineEvent::decode(1, vec![json!(42)]);
        assert!(matches!(ev, EngineEvent::Unknown { event_type: 1, .. }));

        let ev = EngineEvent::decode(99, vec![json!("x")]);
        assert!(matches!(ev, EngineEvent::Unknown { event_type: 99, .. }));
    }

    #[test]
    fn raw_config_path_lookup() {
        let cfg = RawConfig {
            name: "cfg".into(),
            sub_items: vec![RawConfig {
                name: "Hotkey".into(),
                sub_items: vec![RawConfig {
                    name: "TriggerKeys".into(),
                    value: "Control+space".into(),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        };
        assert_eq!(
            cfg.get_path("Hotkey/TriggerKeys").map(|c| c.value.as_str()),
            Some("Control+space")
        );
        assert!(cfg.get_path("Hotkey/Missing").is_none());
    }
}
