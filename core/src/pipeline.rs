//! Applies a request's option list to an engine.
//!
//! # Design
//! Options are applied in order, once per transfer. Most map onto a single
//! engine option; the exceptions are collected while iterating and handed
//! over in one go just before the transfer starts:
//! - header edits become one header list,
//! - mail recipients become one recipient list,
//! - post fields become one multipart form.
//!
//! Header edits keep their raw lines, one per edit. The list sent to the
//! engine is de-duplicated: a replace or remove drops every earlier line for
//! the same name, so the last replace wins regardless of engine behaviour.
//!
//! A rejected option does not stop iteration. Failures are recorded and the
//! transfer is failed when it completes.

use tracing::warn;

use crate::engine::{code, EngineCode, EngineOption, OptionValue, TransferEngine};
use crate::headers::HeaderName;
use crate::option::{HttpMethod, PostField, RequestOption};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderEdit {
    Add,
    Replace,
    Remove,
}

#[derive(Debug, Clone)]
struct HeaderLine {
    name: HeaderName,
    edit: HeaderEdit,
    raw: String,
}

/// Outgoing header edits, in call order.
#[derive(Debug, Clone, Default)]
pub struct HeaderLines {
    lines: Vec<HeaderLine>,
}

impl HeaderLines {
    pub fn add(&mut self, name: &HeaderName, value: &str) {
        self.push(name, HeaderEdit::Add, format!("{name}: {value}"));
    }

    pub fn replace(&mut self, name: &HeaderName, value: &str) {
        self.push(name, HeaderEdit::Replace, format!("{name}: {value}"));
    }

    /// An empty `Name:` line tells the engine not to send that header.
    pub fn remove(&mut self, name: &HeaderName) {
        self.push(name, HeaderEdit::Remove, format!("{name}:"));
    }

    fn push(&mut self, name: &HeaderName, edit: HeaderEdit, raw: String) {
        self.lines.push(HeaderLine {
            name: name.clone(),
            edit,
            raw,
        });
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// One line per edit, in call order.
    pub fn raw_lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|line| line.raw.as_str())
    }

    /// The lines actually handed to the engine.
    pub fn effective_lines(&self) -> Vec<String> {
        let mut kept: Vec<&HeaderLine> = Vec::with_capacity(self.lines.len());
        for line in &self.lines {
            if line.edit != HeaderEdit::Add {
                kept.retain(|earlier| earlier.name != line.name);
            }
            kept.push(line);
        }
        kept.into_iter().map(|line| line.raw.clone()).collect()
    }
}

/// An option the engine refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyFailure {
    pub option: &'static str,
    pub code: EngineCode,
}

/// What applying the options produced, for use by the driver.
#[derive(Debug, Clone, Default)]
pub struct Applied {
    pub header_lines: HeaderLines,
    pub failures: Vec<ApplyFailure>,
    pub fail_on_error: bool,
}

/// Apply `options` to `engine` in order.
///
/// `post_fields` is the request's pending multipart list; it is cleared
/// first and refilled from the `PostField` options.
pub fn apply<E: TransferEngine + ?Sized>(
    options: &[RequestOption],
    post_fields: &mut Vec<PostField>,
    engine: &mut E,
) -> Applied {
    post_fields.clear();
    let mut applier = Applier {
        engine,
        post_fields,
        applied: Applied::default(),
        recipients: Vec::new(),
        raw_body: false,
    };
    for option in options {
        applier.apply_one(option);
    }
    applier.flush()
}

struct Applier<'a, E: ?Sized> {
    engine: &'a mut E,
    post_fields: &'a mut Vec<PostField>,
    applied: Applied,
    recipients: Vec<String>,
    raw_body: bool,
}

impl<E: TransferEngine + ?Sized> Applier<'_, E> {
    fn set(&mut self, source: &'static str, option: EngineOption, value: OptionValue) {
        let code = self.engine.set_option(option, value);
        if code != code::OK {
            warn!(option = source, engine_option = ?option, code, "engine rejected option");
            self.applied.failures.push(ApplyFailure {
                option: source,
                code,
            });
        }
    }

    fn string(&mut self, source: &'static str, option: EngineOption, value: &str) {
        self.set(source, option, OptionValue::Str(value.to_string()));
    }

    fn long(&mut self, source: &'static str, option: EngineOption, value: i64) {
        self.set(source, option, OptionValue::Long(value));
    }

    fn flag(&mut self, source: &'static str, option: EngineOption, on: bool) {
        self.set(source, option, OptionValue::flag(on));
    }

    fn list(&mut self, source: &'static str, option: EngineOption, items: &[String]) {
        self.set(source, option, OptionValue::List(items.to_vec()));
    }

    fn apply_one(&mut self, option: &RequestOption) {
        let name = option.name();
        match option {
            RequestOption::Url(url) => self.string(name, EngineOption::Url, url),
            RequestOption::Port(port) => self.long(name, EngineOption::Port, *port),
            RequestOption::FailOnError => {
                self.applied.fail_on_error = true;
                self.flag(name, EngineOption::FailOnError, true);
            }
            RequestOption::UserPwd(v) => self.string(name, EngineOption::UserPwd, v),
            RequestOption::Proxy(v) => self.string(name, EngineOption::Proxy, v),
            RequestOption::ProxyUserPwd(v) => self.string(name, EngineOption::ProxyUserPwd, v),
            RequestOption::ProxyPort(v) => self.long(name, EngineOption::ProxyPort, *v),
            RequestOption::Timeout(v) => self.long(name, EngineOption::Timeout, *v),
            RequestOption::ConnectTimeout(v) => self.long(name, EngineOption::ConnectTimeout, *v),
            RequestOption::LowSpeedLimit(v) => self.long(name, EngineOption::LowSpeedLimit, *v),
            RequestOption::LowSpeedTime(v) => self.long(name, EngineOption::LowSpeedTime, *v),
            RequestOption::Range(v) => self.string(name, EngineOption::Range, v),
            RequestOption::ResumeFrom(v) => self.long(name, EngineOption::ResumeFrom, *v),
            RequestOption::Cookie(v) => self.string(name, EngineOption::Cookie, v),
            RequestOption::CookieFile(v) => self.string(name, EngineOption::CookieFile, v),
            RequestOption::CookieJar(v) => self.string(name, EngineOption::CookieJar, v),
            RequestOption::FollowLocation(v) => self.flag(name, EngineOption::FollowLocation, *v),
            RequestOption::MaxRedirects(v) => self.long(name, EngineOption::MaxRedirs, *v),
            RequestOption::MaxConnects(v) => self.long(name, EngineOption::MaxConnects, *v),
            RequestOption::AutoReferer(v) => self.flag(name, EngineOption::AutoReferer, *v),
            RequestOption::KrbLevel(v) => self.string(name, EngineOption::KrbLevel, v),
            RequestOption::AddHeader(header, value) => {
                self.applied.header_lines.add(header, value);
            }
            RequestOption::AddHeaders(pairs) => {
                for (header, value) in pairs {
                    self.applied.header_lines.add(header, value);
                }
            }
            RequestOption::ReplaceHeader(header, value) => {
                self.applied.header_lines.replace(header, value);
            }
            RequestOption::RemoveHeader(header) => {
                self.applied.header_lines.remove(header);
            }
            RequestOption::SslCert(v) => self.string(name, EngineOption::SslCert, v),
            RequestOption::SslCertType(v) => self.string(name, EngineOption::SslCertType, v),
            RequestOption::SslKey(v) => self.string(name, EngineOption::SslKey, v),
            RequestOption::SslKeyPwd(v) => self.string(name, EngineOption::SslKeyPasswd, v),
            RequestOption::SslKeyType(v) => self.string(name, EngineOption::SslKeyType, v),
            RequestOption::SslVersion(v) => {
                self.long(name, EngineOption::SslVersion, v.engine_value())
            }
            RequestOption::SslVerifyPeer(v) => self.flag(name, EngineOption::SslVerifyPeer, *v),
            // 2 asks the engine to check the certificate name, 0 disables it.
            RequestOption::SslVerifyHost(v) => {
                self.long(name, EngineOption::SslVerifyHost, if *v { 2 } else { 0 })
            }
            RequestOption::SslCaInfo(v) => self.string(name, EngineOption::CaInfo, v),
            RequestOption::SslCaPath(v) => self.string(name, EngineOption::CaPath, v),
            RequestOption::SslCiphers(ciphers) => {
                self.string(name, EngineOption::SslCipherList, &ciphers.join(":"))
            }
            RequestOption::SslPinnedPublicKey(v) => {
                self.string(name, EngineOption::PinnedPublicKey, v)
            }
            RequestOption::FtpPreCommands(commands) => {
                self.list(name, EngineOption::Quote, commands)
            }
            RequestOption::FtpPostCommands(commands) => {
                self.list(name, EngineOption::PostQuote, commands)
            }
            RequestOption::FtpPort(v) => self.string(name, EngineOption::FtpPort, v),
            RequestOption::FtpResponseTimeout(v) => {
                self.long(name, EngineOption::FtpResponseTimeout, *v)
            }
            RequestOption::SshPublicKey(v) => self.string(name, EngineOption::SshPublicKeyFile, v),
            RequestOption::SshPrivateKey(v) => {
                self.string(name, EngineOption::SshPrivateKeyFile, v)
            }
            RequestOption::HttpMethod(method) => self.method(name, method),
            RequestOption::PostField(field) => self.post_fields.push(field.clone()),
            RequestOption::PostData(bytes) => self.raw_body(name, bytes.clone()),
            RequestOption::PostString(s) => self.raw_body(name, s.as_bytes().to_vec()),
            RequestOption::MailFrom(v) => self.string(name, EngineOption::MailFrom, v),
            RequestOption::MailRcpt(v) => self.recipients.push(v.clone()),
        }
    }

    /// Only GET, POST and HEAD have dedicated engine switches; everything
    /// else is a verb override, which leaves any body in place.
    fn method(&mut self, name: &'static str, method: &HttpMethod) {
        match method {
            HttpMethod::Get => self.flag(name, EngineOption::HttpGet, true),
            HttpMethod::Post => self.flag(name, EngineOption::Post, true),
            HttpMethod::Head => self.flag(name, EngineOption::NoBody, true),
            other => self.string(name, EngineOption::CustomRequest, other.as_str()),
        }
    }

    fn raw_body(&mut self, name: &'static str, bytes: Vec<u8>) {
        self.raw_body = true;
        self.set(name, EngineOption::PostFields, OptionValue::Bytes(bytes));
        self.flag(name, EngineOption::Post, true);
    }

    fn flush(mut self) -> Applied {
        if !self.applied.header_lines.is_empty() {
            let lines = self.applied.header_lines.effective_lines();
            self.set("headers", EngineOption::HttpHeader, OptionValue::List(lines));
        }
        if !self.recipients.is_empty() {
            let recipients = std::mem::take(&mut self.recipients);
            self.set("mailRcpt", EngineOption::MailRcpt, OptionValue::List(recipients));
        }
        if !self.post_fields.is_empty() {
            if self.raw_body {
                warn!("post fields combined with raw post data; engine behaviour is undefined");
            }
            let form = self.post_fields.clone();
            self.set("postField", EngineOption::HttpPost, OptionValue::Form(form));
        }
        self.applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option::TlsVersion;
    use crate::scripted::ScriptedEngine;

    fn run(options: &[RequestOption]) -> (Applied, ScriptedEngine, Vec<PostField>) {
        let mut engine = ScriptedEngine::new();
        let mut fields = Vec::new();
        let applied = apply(options, &mut fields, &mut engine);
        (applied, engine, fields)
    }

    #[test]
    fn simple_options_map_one_to_one() {
        let (applied, engine, _) = run(&[
            RequestOption::Url("http://localhost/".to_string()),
            RequestOption::Timeout(30),
            RequestOption::FollowLocation(true),
            RequestOption::SslVersion(TlsVersion::TlsV1_2),
        ]);
        assert!(applied.failures.is_empty());
        assert_eq!(
            engine.option(EngineOption::Url),
            Some(&OptionValue::Str("http://localhost/".to_string()))
        );
        assert_eq!(engine.option(EngineOption::Timeout), Some(&OptionValue::Long(30)));
        assert_eq!(
            engine.option(EngineOption::FollowLocation),
            Some(&OptionValue::Long(1))
        );
        assert_eq!(engine.option(EngineOption::SslVersion), Some(&OptionValue::Long(6)));
        assert!(engine.option(EngineOption::HttpHeader).is_none());
    }

    #[test]
    fn every_header_edit_appends_one_raw_line() {
        let (applied, _, _) = run(&[
            RequestOption::AddHeader(HeaderName::Accept, "text/html".to_string()),
            RequestOption::ReplaceHeader(HeaderName::Accept, "application/json".to_string()),
            RequestOption::AddHeader(HeaderName::from_standard("X-Dup"), "1".to_string()),
            RequestOption::AddHeader(HeaderName::from_standard("x-dup"), "2".to_string()),
            RequestOption::RemoveHeader(HeaderName::UserAgent),
        ]);
        let raw: Vec<&str> = applied.header_lines.raw_lines().collect();
        assert_eq!(
            raw,
            vec![
                "Accept: text/html",
                "Accept: application/json",
                "X-Dup: 1",
                "x-dup: 2",
                "User-Agent:",
            ]
        );
    }

    #[test]
    fn replace_wins_over_earlier_lines_in_engine_list() {
        let (_, engine, _) = run(&[
            RequestOption::AddHeader(HeaderName::Accept, "text/html".to_string()),
            RequestOption::AddHeader(HeaderName::from_standard("X-Keep"), "yes".to_string()),
            RequestOption::ReplaceHeader(HeaderName::Accept, "application/json".to_string()),
            RequestOption::ReplaceHeader(HeaderName::from_standard("accept"), "*/*".to_string()),
        ]);
        assert_eq!(
            engine.option(EngineOption::HttpHeader),
            Some(&OptionValue::List(vec![
                "X-Keep: yes".to_string(),
                "Accept: */*".to_string(),
            ]))
        );
    }

    #[test]
    fn add_after_remove_survives() {
        let (_, engine, _) = run(&[
            RequestOption::AddHeader(HeaderName::UserAgent, "a".to_string()),
            RequestOption::RemoveHeader(HeaderName::UserAgent),
            RequestOption::AddHeader(HeaderName::UserAgent, "b".to_string()),
        ]);
        assert_eq!(
            engine.option(EngineOption::HttpHeader),
            Some(&OptionValue::List(vec![
                "User-Agent:".to_string(),
                "User-Agent: b".to_string(),
            ]))
        );
    }

    #[test]
    fn add_headers_appends_each_pair() {
        let (applied, _, _) = run(&[RequestOption::AddHeaders(vec![
            (HeaderName::Accept, "a".to_string()),
            (HeaderName::Accept, "b".to_string()),
        ])]);
        assert_eq!(applied.header_lines.len(), 2);
        assert_eq!(applied.header_lines.effective_lines().len(), 2);
    }

    #[test]
    fn post_fields_flush_as_one_form_in_order() {
        let (_, engine, fields) = run(&[
            RequestOption::PostField(PostField::value("a", "1")),
            RequestOption::Url("http://localhost/".to_string()),
            RequestOption::PostField(PostField::file("f", "/tmp/upload.bin")),
            RequestOption::PostField(PostField::value("b", "2")),
        ]);
        assert_eq!(fields.len(), 3);
        match engine.option(EngineOption::HttpPost) {
            Some(OptionValue::Form(form)) => {
                let names: Vec<&str> = form.iter().map(|f| f.name.as_str()).collect();
                assert_eq!(names, vec!["a", "f", "b"]);
                assert!(form[1].is_file());
            }
            other => panic!("expected form, got {other:?}"),
        }
        assert_eq!(engine.set_count(EngineOption::HttpPost), 1);
    }

    #[test]
    fn no_form_without_post_fields() {
        let (_, engine, fields) = run(&[RequestOption::Url("http://localhost/".to_string())]);
        assert!(fields.is_empty());
        assert!(engine.option(EngineOption::HttpPost).is_none());
    }

    #[test]
    fn apply_clears_previous_pending_fields() {
        let mut engine = ScriptedEngine::new();
        let mut fields = vec![PostField::value("stale", "x")];
        apply(
            &[RequestOption::PostField(PostField::value("fresh", "y"))],
            &mut fields,
            &mut engine,
        );
        assert_eq!(fields, vec![PostField::value("fresh", "y")]);
    }

    #[test]
    fn post_string_sets_body_and_post() {
        let (_, engine, _) = run(&[RequestOption::PostString("k=v".to_string())]);
        assert_eq!(
            engine.option(EngineOption::PostFields),
            Some(&OptionValue::Bytes(b"k=v".to_vec()))
        );
        assert_eq!(engine.option(EngineOption::Post), Some(&OptionValue::Long(1)));
    }

    #[test]
    fn methods_map_to_switches_or_custom_verb() {
        let (_, engine, _) = run(&[RequestOption::HttpMethod(HttpMethod::Head)]);
        assert_eq!(engine.option(EngineOption::NoBody), Some(&OptionValue::Long(1)));

        let (_, engine, _) = run(&[
            RequestOption::PostData(b"{}".to_vec()),
            RequestOption::HttpMethod(HttpMethod::Put),
        ]);
        assert_eq!(
            engine.option(EngineOption::CustomRequest),
            Some(&OptionValue::Str("PUT".to_string()))
        );
        assert_eq!(
            engine.option(EngineOption::PostFields),
            Some(&OptionValue::Bytes(b"{}".to_vec()))
        );
    }

    #[test]
    fn mail_recipients_accumulate_into_one_list() {
        let (_, engine, _) = run(&[
            RequestOption::MailFrom("a@example.com".to_string()),
            RequestOption::MailRcpt("b@example.com".to_string()),
            RequestOption::MailRcpt("c@example.com".to_string()),
        ]);
        assert_eq!(
            engine.option(EngineOption::MailRcpt),
            Some(&OptionValue::List(vec![
                "b@example.com".to_string(),
                "c@example.com".to_string(),
            ]))
        );
    }

    #[test]
    fn rejected_option_is_recorded_and_iteration_continues() {
        let mut engine = ScriptedEngine::new().reject(EngineOption::Proxy, code::UNKNOWN_OPTION);
        let mut fields = Vec::new();
        let applied = apply(
            &[
                RequestOption::Proxy("socks5://nowhere".to_string()),
                RequestOption::Timeout(5),
            ],
            &mut fields,
            &mut engine,
        );
        assert_eq!(
            applied.failures,
            vec![ApplyFailure {
                option: "proxy",
                code: code::UNKNOWN_OPTION
            }]
        );
        assert_eq!(engine.option(EngineOption::Timeout), Some(&OptionValue::Long(5)));
    }

    #[test]
    fn fail_on_error_is_tracked() {
        let (applied, engine, _) = run(&[RequestOption::FailOnError]);
        assert!(applied.fail_on_error);
        assert_eq!(
            engine.option(EngineOption::FailOnError),
            Some(&OptionValue::Long(1))
        );
    }
}
