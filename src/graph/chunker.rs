use super::model::GraphError;

/// Window size used for uploads, in characters.
pub const DEFAULT_WINDOW: usize = 32_000;
/// Overlap between consecutive windows, in characters.
pub const DEFAULT_OVERLAP: usize = 1_000;

/// Split `text` into overlapping windows of `window` characters advancing by
/// `window - overlap` each step. The windows are measured in characters so a
/// multi-byte character is never split. Produces exactly
/// `ceil(chars / stride)` chunks; the last may be shorter, none is empty.
pub fn chunks(text: &str, window: usize, overlap: usize) -> Result<Chunks<'_>, GraphError> {
	if window == 0 || overlap >= window {
		return Err(GraphError::InvalidStride { window, overlap });
	}
	// Byte offset of every character boundary, plus the end of the text.
	let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
	boundaries.push(text.len());
	Ok(Chunks {
		text,
		boundaries,
		window,
		stride: window - overlap,
		pos: 0,
	})
}

/// Lazy, restartable (clone before consuming) chunk sequence over a document.
#[derive(Clone, Debug)]
pub struct Chunks<'a> {
	text: &'a str,
	boundaries: Vec<usize>,
	window: usize,
	stride: usize,
	pos: usize,
}

impl<'a> Chunks<'a> {
	fn char_len(&self) -> usize {
		self.boundaries.len() - 1
	}
}

impl<'a> Iterator for Chunks<'a> {
	type Item = &'a str;

	fn next(&mut self) -> Option<&'a str> {
		if self.pos >= self.char_len() {
			return None;
		}
		let start = self.boundaries[self.pos];
		let end = self.boundaries[(self.pos + self.window).min(self.char_len())];
		self.pos += self.stride;
		Some(&self.text[start..end])
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		let remaining = self.char_len().saturating_sub(self.pos).div_ceil(self.stride);
		(remaining, Some(remaining))
	}
}

impl ExactSizeIterator for Chunks<'_> {}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn overlapping_windows() {
		// Every stride start below the text length opens a window, so the
		// tail past the last full window still gets one.
		let out: Vec<&str> = chunks("ABCDEFGHIJ", 4, 2).unwrap().collect();
		assert_eq!(out, ["ABCD", "CDEF", "EFGH", "GHIJ", "IJ"]);
	}

	#[test]
	fn chunk_count_is_ceil_len_over_stride() {
		for (len, window, overlap) in [(10, 4, 2), (9, 4, 2), (1, 4, 2), (100, 7, 3), (6, 6, 0)] {
			let text: String = "x".repeat(len);
			let iter = chunks(&text, window, overlap).unwrap();
			let stride = window - overlap;
			assert_eq!(iter.len(), len.div_ceil(stride));
			assert_eq!(iter.count(), len.div_ceil(stride));
		}
	}

	#[test]
	fn stride_prefixes_reconstruct_the_text() {
		let text = "the quick brown fox jumps over the lazy dog";
		let stride = 5;
		let parts: Vec<&str> = chunks(text, 8, 8 - stride).unwrap().collect();
		let mut rebuilt = String::new();
		for (i, part) in parts.iter().enumerate() {
			if i + 1 < parts.len() {
				rebuilt.extend(part.chars().take(stride));
			} else {
				rebuilt.push_str(part);
			}
		}
		assert_eq!(rebuilt, text);
	}

	#[test]
	fn never_splits_a_character() {
		let text = "héllo wörld, ça va très bien aujourd'hui";
		for chunk in chunks(text, 7, 3).unwrap() {
			assert!(!chunk.is_empty());
			assert!(text.contains(chunk));
		}
	}

	#[test]
	fn empty_text_yields_no_chunks() {
		assert_eq!(chunks("", 4, 2).unwrap().count(), 0);
	}

	#[test]
	fn restartable_by_clone() {
		let iter = chunks("ABCDEFGHIJ", 4, 2).unwrap();
		let first: Vec<&str> = iter.clone().collect();
		let second: Vec<&str> = iter.collect();
		assert_eq!(first, second);
	}

	#[test]
	fn rejects_non_positive_stride() {
		assert!(matches!(
			chunks("abc", 4, 4),
			Err(GraphError::InvalidStride { .. })
		));
		assert!(matches!(
			chunks("abc", 0, 0),
			Err(GraphError::InvalidStride { .. })
		));
	}
}
