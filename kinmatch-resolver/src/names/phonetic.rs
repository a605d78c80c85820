//! American Soundex

/// Four-character Soundex code, or an empty string when `name` has no letters
///
/// H and W do not separate letters with the same code; vowels do.
pub fn soundex(name: &str) -> String {
    let mut letters = name
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase());

    let first = match letters.next() {
        Some(c) => c,
        None => return String::new(),
    };

    let mut code = String::with_capacity(4);
    code.push(first);
    let mut last = digit(first);

    for c in letters {
        if code.len() == 4 {
            break;
        }
        match c {
            'H' | 'W' => continue,
            _ => {}
        }
        let d = digit(c);
        if d != '0' && d != last {
            code.push(d);
        }
        last = d;
    }

    while code.len() < 4 {
        code.push('0');
    }
    code
}

fn digit(c: char) -> char {
    match c {
        'B' | 'F' | 'P' | 'V' => '1',
        'C' | 'G' | 'J' | 'K' | 'Q' | 'S' | 'X' | 'Z' => '2',
        'D' | 'T' => '3',
        'L' => '4',
        'M' | 'N' => '5',
        'R' => '6',
        _ => '0',
    }
}
