//! Integration tests for corpus providers

use charnn_finetune::{CorpusError, CorpusProvider, DirectoryCorpus, TweetServer};
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread;
use tempfile::TempDir;

/// Serve one canned HTTP response and hand back the request line
fn serve_once(status: &'static str, body: &'static str) -> (String, thread::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();
        loop {
            let mut header = String::new();
            reader.read_line(&mut header).unwrap();
            if header == "\r\n" || header.is_empty() {
                break;
            }
        }

        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).unwrap();
        stream.flush().unwrap();
        request_line
    });

    (base, handle)
}

#[test]
fn test_directory_corpus_reads_user_file() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("someone.txt"), "hello\nworld").unwrap();

    let corpus = DirectoryCorpus::new(temp_dir.path());
    assert_eq!(corpus.load("@someone").unwrap(), "hello\nworld");
    assert_eq!(corpus.load("someone").unwrap(), "hello\nworld");
}

#[test]
fn test_directory_corpus_missing_user() {
    let temp_dir = TempDir::new().unwrap();
    let corpus = DirectoryCorpus::new(temp_dir.path());

    assert!(matches!(
        corpus.load("nobody"),
        Err(CorpusError::Unavailable(_))
    ));
}

#[test]
fn test_tweet_server_joins_tweets() {
    let (base, handle) = serve_once("200 OK", r#"{"tweets":["first tweet","second tweet"]}"#);

    let server = TweetServer::new(&base).unwrap();
    let text = server.load("@someone").unwrap();

    assert_eq!(text, "first tweet\nsecond tweet");
    let request_line = handle.join().unwrap();
    assert!(request_line.starts_with("GET /api/someone "));
}

#[test]
fn test_tweet_server_missing_tweets() {
    let (base, handle) = serve_once("200 OK", r#"{"error":"rate limited"}"#);

    let err = TweetServer::new(&base).unwrap().load("someone").unwrap_err();
    assert_eq!(err.to_string(), "Failed to load tweets for someone");
    handle.join().unwrap();
}

#[test]
fn test_tweet_server_error_status() {
    let (base, handle) = serve_once("404 Not Found", "{}");

    let err = TweetServer::new(&base).unwrap().load("someone").unwrap_err();
    assert!(matches!(err, CorpusError::Unavailable(_)));
    handle.join().unwrap();
}
