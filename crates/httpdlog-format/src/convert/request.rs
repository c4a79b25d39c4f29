//! Request-line splitting.

/// The three whitespace-separated pieces of an HTTP request line.
#[derive(Debug, PartialEq, Eq)]
pub struct RequestParts<'a> {
    pub method: &'a str,
    pub url: &'a str,
    pub protocol: &'a str,
}

/// Split a request line (`GET /a/b?x=1 HTTP/1.1`) into method, URL, and
/// protocol. Returns `None` when fewer than three tokens are present.
pub fn split_request(request: &str) -> Option<RequestParts<'_>> {
    let mut tokens = request.split_whitespace();
    let method = tokens.next()?;
    let url = tokens.next()?;
    let protocol = tokens.next()?;
    Some(RequestParts {
        method,
        url,
        protocol,
    })
}

/// Split a URL at the first `?`. The query part keeps its leading `?`; an
/// absent or empty query is `None`.
pub fn split_url(url: &str) -> (&str, Option<&str>) {
    match url.find('?') {
        Some(pos) => {
            let query = &url[pos..];
            (&url[..pos], if query.len() > 1 { Some(query) } else { None })
        }
        None => (url, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_request() {
        let parts = split_request("GET /index.html HTTP/1.0").unwrap();
        assert_eq!(parts.method, "GET");
        assert_eq!(parts.url, "/index.html");
        assert_eq!(parts.protocol, "HTTP/1.0");
    }

    #[test]
    fn short_request_fails() {
        assert!(split_request("GET /index.html").is_none());
        assert!(split_request("").is_none());
        assert!(split_request("-").is_none());
    }

    #[test]
    fn url_query_split() {
        assert_eq!(split_url("/a/b?x=1&y=2"), ("/a/b", Some("?x=1&y=2")));
        assert_eq!(split_url("/a/b"), ("/a/b", None));
        // A bare trailing '?' is an empty query string, which is NULL.
        assert_eq!(split_url("/a/b?"), ("/a/b", None));
        assert_eq!(split_url("?x=1"), ("", Some("?x=1")));
    }
}
