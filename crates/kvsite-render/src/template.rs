//! Worker script template.

/// Placeholder replaced with the namespace binding identifier.
pub const NAMESPACE: &str = "{namespace}";
/// Placeholder replaced with the JSON object mapping large-file keys to chunk keys.
pub const LARGE_FILES: &str = "{large_files}";
/// Placeholder replaced with the JSON array of small-file keys.
pub const SMALL_FILES: &str = "{small_files}";

/// Every placeholder, each of which appears exactly once in [`WORKER`].
pub const PLACEHOLDERS: [&str; 3] = [NAMESPACE, LARGE_FILES, SMALL_FILES];

/// Edge worker serving files published by kvsite.
///
/// Request flow:
/// 1. the request path (without its leading `/`) is percent-decoded and
///    normalized the same way file paths are, so `/docs/a%20b.html` asks for
///    the key of `docs/a b.html` below the published root;
/// 2. large files are streamed chunk by chunk, sorted by chunk index (which
///    must run `0..n` without gaps), pulling chunk N+1 only once chunk N has
///    been fully enqueued;
/// 3. small files are fetched with a single `get`;
/// 4. anything else is a 404.
///
/// A failed chunk fetch errors the stream; bytes already sent stay sent.
pub const WORKER: &str = r#"// Generated by kvsite. Do not edit; re-run `kvsite publish` instead.

const namespace = {namespace};
const largeFiles = {large_files};
const smallFiles = {small_files};

addEventListener('fetch', event => {
    event.respondWith(handleRequest(event.request));
});

async function handleRequest(request) {
    const url = new URL(request.url);
    const key = decodePath(url.pathname.replace(/^\//, "")).replace(/\//g, "_");

    let content = null;
    if (Object.prototype.hasOwnProperty.call(largeFiles, key)) {
        content = streamParts(namespace, key, largeFiles[key]);
    } else if (smallFiles.includes(key)) {
        content = await namespace.get(key, 'arrayBuffer');
    }

    if (content === null) {
        return new Response("not found", {status: 404});
    }

    // TODO: derive the content type from the file extension.
    const contentType = "text/html";
    return new Response(content, {headers: {"Content-Type": contentType}});
}

function decodePath(path) {
    try {
        return decodeURIComponent(path);
    } catch (e) {
        return path;
    }
}

function chunkIndex(base, chunkKey) {
    if (chunkKey === base) {
        return 0;
    }
    const suffix = chunkKey.startsWith(base + "_") ? chunkKey.slice(base.length + 1) : "";
    if (!/^[1-9][0-9]*$/.test(suffix)) {
        throw new Error("chunk " + chunkKey + " does not belong to " + base);
    }
    return parseInt(suffix, 10);
}

function streamParts(namespace, base, chunkKeys) {
    const indexed = chunkKeys
        .map(chunkKey => [chunkIndex(base, chunkKey), chunkKey])
        .sort((a, b) => a[0] - b[0]);
    indexed.forEach((entry, i) => {
        if (entry[0] !== i) {
            throw new Error("chunks of " + base + " are not contiguous");
        }
    });
    const ordered = indexed.map(entry => entry[1]);
    let next = 0;
    let reader = null;

    return new ReadableStream({
        async pull(controller) {
            while (true) {
                if (reader === null) {
                    if (next >= ordered.length) {
                        controller.close();
                        return;
                    }
                    const chunkKey = ordered[next++];
                    const part = await namespace.get(chunkKey, 'stream');
                    if (part === null) {
                        throw new Error("missing chunk " + chunkKey);
                    }
                    reader = part.getReader();
                }
                const {done, value} = await reader.read();
                if (done) {
                    reader = null;
                    continue;
                }
                controller.enqueue(value);
                return;
            }
        }
    });
}
"#;
