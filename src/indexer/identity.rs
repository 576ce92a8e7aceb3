/// Build the record id for one part of a chunk:
/// `file_path:chunk_type:name:start_line`, plus `:part_<i>` when the chunk was
/// split into more than one part.
///
/// Ids are not checked against storage; two runs over the same input produce
/// the same ids.
pub fn chunk_id(
    file_path: &str,
    chunk_type: &str,
    name: &str,
    start_line: usize,
    part_index: usize,
    total_parts: usize,
) -> String {
    let base = format!("{file_path}:{chunk_type}:{name}:{start_line}");
    if total_parts > 1 {
        format!("{base}:part_{part_index}")
    } else {
        base
    }
}
