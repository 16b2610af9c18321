//! URL path canonicalization.

use std::borrow::Cow;

/// Canonicalize a URL path.
///
/// The returned path always begins with '/', contains no empty, `.` or `..`
/// elements, and keeps a trailing slash when the final element produced one
/// (`/a/b/.` becomes `/a/b/`). A `..` element never ascends past the root.
/// Already-clean input is returned borrowed, without allocating.
///
/// # Examples
///
/// ```
/// use microroute_rs::clean_path;
///
/// assert_eq!(clean_path(""), "/");
/// assert_eq!(clean_path("/a//b"), "/a/b");
/// assert_eq!(clean_path("/a/../b"), "/b");
/// assert_eq!(clean_path("/../path"), "/path");
/// ```
pub fn clean_path(p: &str) -> Cow<'_, str> {
    if p.is_empty() {
        return Cow::Borrowed("/");
    }

    let src = p.as_bytes();
    let n = src.len();

    // The output is built lazily: while it matches the input byte for byte,
    // only the write cursor `w` advances and no buffer exists.
    let mut buf: Option<Vec<u8>> = None;
    let mut r = 1;
    let mut w = 1;

    if src[0] != b'/' {
        r = 0;
        let mut b = Vec::with_capacity(n + 1);
        b.push(b'/');
        buf = Some(b);
    }

    let mut trailing = n > 1 && src[n - 1] == b'/';

    while r < n {
        if src[r] == b'/' {
            // empty path element
            r += 1;
        } else if src[r] == b'.' && r + 1 == n {
            trailing = true;
            r += 1;
        } else if src[r] == b'.' && src[r + 1] == b'/' {
            // . element
            r += 2;
        } else if src[r] == b'.' && src[r + 1] == b'.' && (r + 2 == n || src[r + 2] == b'/') {
            // .. element: remove to last '/', never past the root
            r += 3;
            if w > 1 {
                w -= 1;
                match &mut buf {
                    None => {
                        while w > 1 && src[w] != b'/' {
                            w -= 1;
                        }
                    }
                    Some(b) => {
                        while w > 1 && b[w] != b'/' {
                            w -= 1;
                        }
                        b.truncate(w);
                    }
                }
            }
        } else {
            // real path element; add a slash if needed
            if w > 1 {
                buf_app(&mut buf, src, &mut w, b'/');
            }
            while r < n && src[r] != b'/' {
                buf_app(&mut buf, src, &mut w, src[r]);
                r += 1;
            }
        }
    }

    // re-append a trailing slash produced by the last element
    if trailing && w > 1 {
        buf_app(&mut buf, src, &mut w, b'/');
    }

    match buf {
        None => Cow::Borrowed(&p[..w]),
        Some(b) => match String::from_utf8(b) {
            Ok(s) => Cow::Owned(s),
            Err(e) => Cow::Owned(String::from_utf8_lossy(e.as_bytes()).into_owned()),
        },
    }
}

/// Append `c` to the lazily materialized buffer. As long as the output still
/// mirrors the input, only the write cursor moves.
fn buf_app(buf: &mut Option<Vec<u8>>, src: &[u8], w: &mut usize, c: u8) {
    match buf {
        None => {
            if *w < src.len() && src[*w] == c {
                *w += 1;
                return;
            }
            let mut b = Vec::with_capacity(src.len() + 1);
            b.extend_from_slice(&src[..*w]);
            b.push(c);
            *w += 1;
            *buf = Some(b);
        }
        Some(b) => {
            b.push(c);
            *w += 1;
        }
    }
}
