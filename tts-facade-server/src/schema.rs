//! Request schema for `POST /v1/text:synthesize` and its structural validation.
//!
//! Validation runs over the raw JSON body before any handler logic and reports
//! every structural problem at once, in field-declaration order, using the
//! FastAPI/pydantic error shape:
//!
//! ```json
//! {"type": "missing", "loc": ["body", "input"], "msg": "Field required", "input": {}}
//! ```
//!
//! Semantic checks (voice lookup, supported encodings, ranges) are not done
//! here; see [`crate::facade`].

use serde::Serialize;
use serde_json::{Map, Value, json};

/// Default voice style.
pub const DEFAULT_STYLE: &str = "";
/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f64 = 0.3;
/// Default nucleus sampling threshold.
pub const DEFAULT_TOP_P: f64 = 0.7;
/// Default top-k sampling cutoff.
pub const DEFAULT_TOP_K: i64 = 20;
/// Default sampling seed.
pub const DEFAULT_SEED: i64 = 42;
/// Default speaking rate.
pub const DEFAULT_SPEAKING_RATE: f64 = 1.0;
/// Default pitch (semitones).
pub const DEFAULT_PITCH: f64 = 0.0;
/// Default volume gain (dB).
pub const DEFAULT_VOLUME_GAIN_DB: f64 = 0.0;
/// Default output sample rate.
pub const DEFAULT_SAMPLE_RATE_HERTZ: i64 = 24000;
/// Default number of text segments synthesized per provider batch.
pub const DEFAULT_BATCH_SIZE: i64 = 4;
/// Default segment length (characters) at which text is split.
pub const DEFAULT_SPLITER_THRESHOLD: i64 = 100;

/// A structurally valid synthesis request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizeRequest {
    pub input: TextInput,
    pub voice: VoiceSelection,
    pub audio_config: AudioConfig,
}

/// Text (or SSML) to synthesize.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssml: Option<String>,
}

/// Voice selection and sampling parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceSelection {
    pub language_code: String,
    pub name: String,
    pub style: String,
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: i64,
    pub seed: i64,
}

/// Output audio parameters.
///
/// `audio_encoding` stays a string here; an unknown value is a domain error,
/// not a schema error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioConfig {
    pub audio_encoding: String,
    pub speaking_rate: f64,
    pub pitch: f64,
    pub volume_gain_db: f64,
    pub sample_rate_hertz: i64,
    pub batch_size: i64,
    pub spliter_threshold: i64,
}

/// One segment of an error location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LocItem {
    Key(String),
    Index(usize),
}

impl From<&str> for LocItem {
    fn from(key: &str) -> Self {
        LocItem::Key(key.to_string())
    }
}

/// A single structural validation failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub loc: Vec<LocItem>,
    pub msg: String,
    pub input: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ctx: Option<Value>,
}

impl FieldError {
    fn new(kind: &'static str, loc: Vec<LocItem>, msg: &str, input: &Value) -> Self {
        Self {
            kind,
            loc,
            msg: msg.to_string(),
            input: input.clone(),
            ctx: None,
        }
    }

    /// Dotted path without the leading `body` segment, e.g. `voice.name`.
    pub fn field_path(&self) -> String {
        self.loc
            .iter()
            .skip(1)
            .map(|item| match item {
                LocItem::Key(k) => k.clone(),
                LocItem::Index(i) => i.to_string(),
            })
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// All structural failures of one request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field_path(), e.msg))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

const MSG_MISSING: &str = "Field required";
const MSG_OBJECT: &str = "Input should be a valid dictionary or object to extract fields from";
const MSG_STRING: &str = "Input should be a valid string";
const MSG_FLOAT: &str = "Input should be a valid number";
const MSG_FLOAT_PARSING: &str =
    "Input should be a valid number, unable to parse string as a number";
const MSG_INT: &str = "Input should be a valid integer";
const MSG_INT_PARSING: &str =
    "Input should be a valid integer, unable to parse string as an integer";
const MSG_INT_FROM_FLOAT: &str =
    "Input should be a valid integer, got a number with a fractional part";

/// Parse and structurally validate a raw request body.
pub fn parse_request(body: &[u8]) -> Result<SynthesizeRequest, ValidationErrors> {
    if body.is_empty() {
        return Err(missing_body());
    }

    let value: Value = serde_json::from_slice(body).map_err(|e| {
        let mut err = FieldError::new(
            "json_invalid",
            vec!["body".into(), LocItem::Index(byte_offset(body, e.line(), e.column()))],
            "JSON decode error",
            &json!({}),
        );
        err.ctx = Some(json!({ "error": e.to_string() }));
        ValidationErrors(vec![err])
    })?;

    // A JSON `null` body counts as no body at all.
    if value.is_null() {
        return Err(missing_body());
    }

    SynthesizeRequest::from_value(&value)
}

fn missing_body() -> ValidationErrors {
    ValidationErrors(vec![FieldError::new(
        "missing",
        vec!["body".into()],
        MSG_MISSING,
        &Value::Null,
    )])
}

/// Translate serde_json's 1-based line/column into a byte offset.
fn byte_offset(body: &[u8], line: usize, column: usize) -> usize {
    let line_start: usize = body
        .split(|b| *b == b'\n')
        .take(line.saturating_sub(1))
        .map(|l| l.len() + 1)
        .sum();
    (line_start + column.saturating_sub(1)).min(body.len())
}

impl SynthesizeRequest {
    /// Validate an already parsed JSON body.
    pub fn from_value(body: &Value) -> Result<Self, ValidationErrors> {
        let mut walker = Walker::default();
        let root = vec![LocItem::from("body")];

        let request = walker.object(body, &root).and_then(|obj| {
            let input = walker
                .required(obj, body, "input", &root)
                .and_then(|v| walker.text_input(v, &at(&root, "input")));
            let voice = walker
                .required(obj, body, "voice", &root)
                .and_then(|v| walker.voice(v, &at(&root, "voice")));
            let audio_config = walker
                .required(obj, body, "audioConfig", &root)
                .and_then(|v| walker.audio_config(v, &at(&root, "audioConfig")));

            Some(SynthesizeRequest {
                input: input?,
                voice: voice?,
                audio_config: audio_config?,
            })
        });

        match request {
            Some(request) if walker.errors.is_empty() => Ok(request),
            _ => Err(ValidationErrors(walker.errors)),
        }
    }
}

fn at(loc: &[LocItem], key: &str) -> Vec<LocItem> {
    let mut loc = loc.to_vec();
    loc.push(key.into());
    loc
}

/// Accumulates errors while walking the body.
///
/// Every method returns `None` only after recording at least one error.
#[derive(Default)]
struct Walker {
    errors: Vec<FieldError>,
}

impl Walker {
    fn fail(&mut self, kind: &'static str, loc: Vec<LocItem>, msg: &str, input: &Value) {
        self.errors.push(FieldError::new(kind, loc, msg, input));
    }

    fn object<'v>(&mut self, value: &'v Value, loc: &[LocItem]) -> Option<&'v Map<String, Value>> {
        match value {
            Value::Object(map) => Some(map),
            other => {
                self.fail("model_attributes_type", loc.to_vec(), MSG_OBJECT, other);
                None
            }
        }
    }

    fn required<'v>(
        &mut self,
        obj: &'v Map<String, Value>,
        parent: &Value,
        key: &str,
        loc: &[LocItem],
    ) -> Option<&'v Value> {
        let value = obj.get(key);
        if value.is_none() {
            self.fail("missing", at(loc, key), MSG_MISSING, parent);
        }
        value
    }

    fn string(&mut self, value: &Value, loc: Vec<LocItem>) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            other => {
                self.fail("string_type", loc, MSG_STRING, other);
                None
            }
        }
    }

    fn optional_string(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        loc: &[LocItem],
    ) -> Option<Option<String>> {
        match obj.get(key) {
            None | Some(Value::Null) => Some(None),
            Some(v) => self.string(v, at(loc, key)).map(Some),
        }
    }

    fn float(&mut self, value: &Value, loc: Vec<LocItem>) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64().or_else(|| {
                self.fail("float_type", loc, MSG_FLOAT, value);
                None
            }),
            Value::String(s) => match s.trim().parse::<f64>() {
                Ok(f) if f.is_finite() => Some(f),
                _ => {
                    self.fail("float_parsing", loc, MSG_FLOAT_PARSING, value);
                    None
                }
            },
            other => {
                self.fail("float_type", loc, MSG_FLOAT, other);
                None
            }
        }
    }

    fn int(&mut self, value: &Value, loc: Vec<LocItem>) -> Option<i64> {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    return Some(i);
                }
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Some(f as i64),
                    Some(f) if f.fract() != 0.0 => {
                        self.fail("int_from_float", loc, MSG_INT_FROM_FLOAT, value);
                        None
                    }
                    _ => {
                        self.fail("int_type", loc, MSG_INT, value);
                        None
                    }
                }
            }
            Value::String(s) => s.trim().parse::<i64>().ok().or_else(|| {
                self.fail("int_parsing", loc, MSG_INT_PARSING, value);
                None
            }),
            other => {
                self.fail("int_type", loc, MSG_INT, other);
                None
            }
        }
    }

    fn float_or(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        loc: &[LocItem],
        default: f64,
    ) -> Option<f64> {
        match obj.get(key) {
            None => Some(default),
            Some(v) => self.float(v, at(loc, key)),
        }
    }

    fn int_or(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        loc: &[LocItem],
        default: i64,
    ) -> Option<i64> {
        match obj.get(key) {
            None => Some(default),
            Some(v) => self.int(v, at(loc, key)),
        }
    }

    fn text_input(&mut self, value: &Value, loc: &[LocItem]) -> Option<TextInput> {
        let obj = self.object(value, loc)?;
        let text = self.optional_string(obj, "text", loc);
        let ssml = self.optional_string(obj, "ssml", loc);

        let (text, ssml) = (text?, ssml?);
        if text.is_none() && ssml.is_none() {
            self.fail("missing", at(loc, "text"), MSG_MISSING, value);
            return None;
        }
        Some(TextInput { text, ssml })
    }

    fn voice(&mut self, value: &Value, loc: &[LocItem]) -> Option<VoiceSelection> {
        let obj = self.object(value, loc)?;

        let language_code = self
            .required(obj, value, "languageCode", loc)
            .and_then(|v| self.string(v, at(loc, "languageCode")));
        let name = self
            .required(obj, value, "name", loc)
            .and_then(|v| self.string(v, at(loc, "name")));
        let style = match obj.get("style") {
            None => Some(DEFAULT_STYLE.to_string()),
            Some(v) => self.string(v, at(loc, "style")),
        };
        let temperature = self.float_or(obj, "temperature", loc, DEFAULT_TEMPERATURE);
        let top_p = self.float_or(obj, "topP", loc, DEFAULT_TOP_P);
        let top_k = self.int_or(obj, "topK", loc, DEFAULT_TOP_K);
        let seed = self.int_or(obj, "seed", loc, DEFAULT_SEED);

        Some(VoiceSelection {
            language_code: language_code?,
            name: name?,
            style: style?,
            temperature: temperature?,
            top_p: top_p?,
            top_k: top_k?,
            seed: seed?,
        })
    }

    fn audio_config(&mut self, value: &Value, loc: &[LocItem]) -> Option<AudioConfig> {
        let obj = self.object(value, loc)?;

        let audio_encoding = self
            .required(obj, value, "audioEncoding", loc)
            .and_then(|v| self.string(v, at(loc, "audioEncoding")));
        let speaking_rate = self.float_or(obj, "speakingRate", loc, DEFAULT_SPEAKING_RATE);
        let pitch = self.float_or(obj, "pitch", loc, DEFAULT_PITCH);
        let volume_gain_db = self.float_or(obj, "volumeGainDb", loc, DEFAULT_VOLUME_GAIN_DB);
        let sample_rate_hertz = self.int_or(obj, "sampleRateHertz", loc, DEFAULT_SAMPLE_RATE_HERTZ);
        let batch_size = self.int_or(obj, "batchSize", loc, DEFAULT_BATCH_SIZE);
        let spliter_threshold =
            self.int_or(obj, "spliterThreshold", loc, DEFAULT_SPLITER_THRESHOLD);

        Some(AudioConfig {
            audio_encoding: audio_encoding?,
            speaking_rate: speaking_rate?,
            pitch: pitch?,
            volume_gain_db: volume_gain_db?,
            sample_rate_hertz: sample_rate_hertz?,
            batch_size: batch_size?,
            spliter_threshold: spliter_threshold?,
        })
    }
}
