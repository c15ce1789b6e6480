//! HTTP method types.

use std::str::FromStr;

use derive_more::Display;

/// HTTP request method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
pub enum Method {
    /// GET method.
    #[display("GET")]
    Get,
    /// POST method.
    #[display("POST")]
    Post,
    /// PUT method.
    #[display("PUT")]
    Put,
    /// PATCH method.
    #[display("PATCH")]
    Patch,
    /// DELETE method.
    #[display("DELETE")]
    Delete,
    /// HEAD method.
    #[display("HEAD")]
    Head,
    /// OPTIONS method.
    #[display("OPTIONS")]
    Options,
    /// Any other method token (`TRACE`, `PROPFIND`, ...).
    #[display("{_0}")]
    Other(http::Method),
}

impl Method {
    /// GET and HEAD send no body and keep their method on a 301, 302 or 303.
    #[must_use]
    pub const fn is_bodyless(&self) -> bool {
        matches!(self, Self::Get | Self::Head)
    }
}

impl FromStr for Method {
    type Err = crate::Error;

    /// Parses a method name. Method names are case-sensitive; unknown but
    /// valid tokens become [`Method::Other`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        http::Method::from_bytes(s.as_bytes())
            .map(Self::from)
            .map_err(|e| crate::Error::invalid_request(format!("{s:?}: {e}")))
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => Self::GET,
            Method::Post => Self::POST,
            Method::Put => Self::PUT,
            Method::Patch => Self::PATCH,
            Method::Delete => Self::DELETE,
            Method::Head => Self::HEAD,
            Method::Options => Self::OPTIONS,
            Method::Other(method) => method,
        }
    }
}

impl From<http::Method> for Method {
    fn from(method: http::Method) -> Self {
        let known = match method.as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            "HEAD" => Some(Self::Head),
            "OPTIONS" => Some(Self::Options),
            _ => None,
        };
        known.unwrap_or_else(|| Self::Other(method))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_display() {
        assert_eq!(Method::Get.to_string(), "GET");
        assert_eq!(Method::Patch.to_string(), "PATCH");
        assert_eq!(Method::Options.to_string(), "OPTIONS");
    }

    #[test]
    fn method_from_str() {
        assert_eq!("POST".parse::<Method>().expect("POST"), Method::Post);
        assert_eq!("HEAD".parse::<Method>().expect("HEAD"), Method::Head);
        assert!("GET /".parse::<Method>().is_err());
        assert!("".parse::<Method>().is_err());
    }

    #[test]
    fn extension_methods_are_accepted() {
        let propfind = "PROPFIND".parse::<Method>().expect("PROPFIND");
        assert_eq!(propfind.to_string(), "PROPFIND");
        assert_eq!(http::Method::from(propfind).as_str(), "PROPFIND");

        // Case-sensitive: "post" is an extension token, not POST.
        let lower = "post".parse::<Method>().expect("token");
        assert_ne!(lower, Method::Post);
        assert_eq!(Method::from(http::Method::TRACE).to_string(), "TRACE");
        assert_eq!(Method::from(http::Method::PUT), Method::Put);
    }

    #[test]
    fn method_is_bodyless() {
        assert!(Method::Get.is_bodyless());
        assert!(Method::Head.is_bodyless());
        assert!(!Method::Post.is_bodyless());
        assert!(!Method::Delete.is_bodyless());
        assert!(!Method::Other(http::Method::TRACE).is_bodyless());
    }

    #[test]
    fn method_into_http() {
        assert_eq!(http::Method::from(Method::Delete), http::Method::DELETE);
        assert_eq!(http::Method::from(Method::Post), http::Method::POST);
    }
}
