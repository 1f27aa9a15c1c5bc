//! Canonical header names.
//!
//! # Design
//! Header names are matched case-insensitively everywhere: request-side
//! header edits are de-duplicated by name and response-side lookups compare
//! against whatever casing the server sent. Well-known names get a dedicated
//! variant so their standard spelling is used when a request line is built;
//! anything else is kept verbatim in `Custom`.

use std::fmt;
use std::hash::{Hash, Hasher};

macro_rules! standard_headers {
    ($($variant:ident => $name:literal,)+) => {
        /// A header name, normalized to a canonical identity.
        ///
        /// Equality and hashing ignore ASCII case, so `"content-type"` and
        /// `HeaderName::ContentType` are the same header.
        #[derive(Debug, Clone)]
        pub enum HeaderName {
            $($variant,)+
            /// A header without a dedicated variant, spelled as given.
            Custom(String),
        }

        impl HeaderName {
            /// Normalize a raw header name into its canonical identity.
            pub fn from_standard(name: &str) -> Self {
                $(
                    if name.eq_ignore_ascii_case($name) {
                        return HeaderName::$variant;
                    }
                )+
                HeaderName::Custom(name.to_string())
            }

            /// The spelling used when this header is written on the wire.
            pub fn standard_name(&self) -> &str {
                match self {
                    $(HeaderName::$variant => $name,)+
                    HeaderName::Custom(name) => name,
                }
            }
        }
    };
}

standard_headers! {
    Accept => "Accept",
    AcceptCharset => "Accept-Charset",
    AcceptEncoding => "Accept-Encoding",
    AcceptLanguage => "Accept-Language",
    AcceptRanges => "Accept-Ranges",
    Age => "Age",
    Allow => "Allow",
    Authorization => "Authorization",
    CacheControl => "Cache-Control",
    Connection => "Connection",
    ContentDisposition => "Content-Disposition",
    ContentEncoding => "Content-Encoding",
    ContentLanguage => "Content-Language",
    ContentLength => "Content-Length",
    ContentLocation => "Content-Location",
    ContentRange => "Content-Range",
    ContentType => "Content-Type",
    Cookie => "Cookie",
    Date => "Date",
    ETag => "ETag",
    Expect => "Expect",
    Expires => "Expires",
    Host => "Host",
    IfMatch => "If-Match",
    IfModifiedSince => "If-Modified-Since",
    IfNoneMatch => "If-None-Match",
    LastModified => "Last-Modified",
    Location => "Location",
    Origin => "Origin",
    Pragma => "Pragma",
    ProxyAuthenticate => "Proxy-Authenticate",
    ProxyAuthorization => "Proxy-Authorization",
    Range => "Range",
    Referer => "Referer",
    RetryAfter => "Retry-After",
    Server => "Server",
    SetCookie => "Set-Cookie",
    TransferEncoding => "Transfer-Encoding",
    Upgrade => "Upgrade",
    UserAgent => "User-Agent",
    Vary => "Vary",
    Via => "Via",
    WwwAuthenticate => "WWW-Authenticate",
    XForwardedFor => "X-Forwarded-For",
}

impl PartialEq for HeaderName {
    fn eq(&self, other: &Self) -> bool {
        self.standard_name()
            .eq_ignore_ascii_case(other.standard_name())
    }
}

impl Eq for HeaderName {}

impl Hash for HeaderName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.standard_name().bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
    }
}

impl fmt::Display for HeaderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.standard_name())
    }
}

impl From<&str> for HeaderName {
    fn from(name: &str) -> Self {
        HeaderName::from_standard(name)
    }
}

impl From<String> for HeaderName {
    fn from(name: String) -> Self {
        HeaderName::from_standard(&name)
    }
}

impl From<&HeaderName> for HeaderName {
    fn from(name: &HeaderName) -> Self {
        name.clone()
    }
}
