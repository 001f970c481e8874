/// Directory part of a URL or path, including the trailing `/`.
pub fn base_directory(url: &str) -> &str {
    let end = url.find(|c: char| c == '?' || c == '#').unwrap_or(url.len());
    let path = &url[..end];
    match path.rfind('/') {
        Some(i) => &path[..=i],
        None => "",
    }
}

fn has_scheme(uri: &str) -> bool {
    if uri.starts_with("data:") || uri.starts_with("blob:") {
        return true;
    }
    match (uri.find("://"), uri.find('/')) {
        (Some(scheme_end), Some(first_slash)) => scheme_end < first_slash,
        (Some(_), None) => true,
        _ => false,
    }
}

fn origin(url: &str) -> Option<&str> {
    let scheme_end = url.find("://")? + 3;
    let host_end = url[scheme_end..]
        .find('/')
        .map(|i| scheme_end + i)
        .unwrap_or(url.len());
    Some(&url[..host_end])
}

/// Resolves an asset URI found inside a tile against the tile's own URL.
pub fn resolve_uri(base_url: &str, uri: &str) -> String {
    if has_scheme(uri) {
        return uri.to_string();
    }
    if uri.starts_with('/') {
        return match origin(base_url) {
            Some(origin) => format!("{origin}{uri}"),
            None => uri.to_string(),
        };
    }

    let directory = base_directory(base_url);
    let (prefix, dir_path) = match origin(directory) {
        Some(origin) => (origin, &directory[origin.len()..]),
        None => ("", directory),
    };

    let mut segments: Vec<&str> = dir_path.split('/').filter(|s| !s.is_empty()).collect();
    for segment in uri.split('/') {
        match segment {
            "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let rooted = dir_path.starts_with('/') || !prefix.is_empty();
    let joined = segments.join("/");
    if rooted {
        format!("{prefix}/{joined}")
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_uris_pass_through() {
        assert_eq!(
            resolve_uri("https://a.com/t/1.i3dm", "https://cdn.com/tree.glb"),
            "https://cdn.com/tree.glb"
        );
        assert_eq!(resolve_uri("t/1.i3dm", "data:model/gltf;base64,AA"), "data:model/gltf;base64,AA");
    }

    #[test]
    fn relative_uris_join_the_tile_directory() {
        assert_eq!(
            resolve_uri("https://a.com/tiles/0/1.i3dm?v=2", "tree.glb"),
            "https://a.com/tiles/0/tree.glb"
        );
        assert_eq!(
            resolve_uri("https://a.com/tiles/0/1.i3dm", "../models/./tree.glb"),
            "https://a.com/tiles/models/tree.glb"
        );
        assert_eq!(resolve_uri("tiles/1.i3dm", "tree.glb"), "tiles/tree.glb");
        assert_eq!(resolve_uri("/data/1.i3dm", "tree.glb"), "/data/tree.glb");
    }

    #[test]
    fn rooted_uris_join_the_origin() {
        assert_eq!(
            resolve_uri("https://a.com/tiles/1.i3dm", "/models/tree.glb"),
            "https://a.com/models/tree.glb"
        );
    }

    #[test]
    fn base_directory_strips_file_and_query() {
        assert_eq!(base_directory("https://a.com/t/1.i3dm?x=1"), "https://a.com/t/");
        assert_eq!(base_directory("1.i3dm"), "");
    }
}
