use crate::Console;

/// Each value followed by `"; "`, in index order.
pub fn format_results(values: &[i32]) -> String {
    values.iter().map(|v| format!("{}; ", v)).collect()
}

pub fn print_results(console: &Console, values: &[i32]) {
    console.line("");
    console.line("Results:");
    console.line(format_results(values));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_results() {
        assert_eq!(format_results(&[20, 20, 22]), "20; 20; 22; ");
        assert_eq!(format_results(&[]), "");
    }

    #[test]
    fn test_print_results() {
        let (console, captured) = Console::capture();
        print_results(&console, &[1, -2]);
        assert_eq!(captured.contents(), "\nResults:\n1; -2; \n");
    }
}
