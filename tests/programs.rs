use ala::{assemble, AlaError, Cpu, RunFlags};

fn run(sources: &[(&str, &str)], flags: RunFlags, input: &str) -> Result<(Cpu, String), AlaError> {
    let program = assemble(sources, flags)?;
    let mut cpu = Cpu::new(program, flags);
    let mut output = Vec::new();
    cpu.run(&mut input.as_bytes(), &mut output)?;
    Ok((cpu, String::from_utf8_lossy(&output).into_owned()))
}

#[test]
fn test_hello() {
    let source = include_str!("../programs/hello.ala");
    let (cpu, out) = run(&[("hello.ala", source)], RunFlags::empty(), "").unwrap();
    assert_eq!(out, "HI\n");
    assert_eq!(cpu.alu.ix, 3);
}

#[test]
fn test_countdown() {
    let source = include_str!("../programs/countdown.ala");
    let (cpu, out) = run(&[("countdown.ala", source)], RunFlags::PRINT_NUMBERS, "").unwrap();
    assert_eq!(out, "3\n2\n1\n");
    assert_eq!(cpu.alu.acc, 0);
}

#[test]
fn test_subroutine_in_another_file() {
    let sources = [
        ("main.ala", include_str!("../programs/main.ala")),
        ("double.ala", include_str!("../programs/double.ala")),
    ];
    let (cpu, out) = run(&sources, RunFlags::EXTRA | RunFlags::PRINT_NUMBERS, "").unwrap();
    assert_eq!(out, "20\n");
    assert_eq!(cpu.program.label_data("VALUE"), Some(20));
}

#[test]
fn test_subroutine_needs_extra() {
    let sources = [
        ("main.ala", include_str!("../programs/main.ala")),
        ("double.ala", include_str!("../programs/double.ala")),
    ];
    let err = run(&sources, RunFlags::PRINT_NUMBERS, "").unwrap_err();
    assert!(err.to_string().starts_with(
        "main.ala(1): ERROR: The instruction 'CALL' doesn't exist in A level assembly"
    ));
}

#[test]
fn test_missing_file_is_an_undefined_label() {
    let err = run(
        &[("main.ala", include_str!("../programs/main.ala"))],
        RunFlags::EXTRA,
        "",
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "main.ala(1): ERROR: Undefined label 'DOUBLE'");
}

#[test]
fn test_echo() {
    let source = include_str!("../programs/echo.ala");
    let (cpu, out) = run(&[("echo.ala", source)], RunFlags::empty(), "ala!").unwrap();
    assert_eq!(out, "ala!");
    assert_eq!(cpu.alu.acc, -1);
}

#[test]
fn test_pointers() {
    let source = include_str!("../programs/pointers.ala");
    let (cpu, out) = run(&[("pointers.ala", source)], RunFlags::empty(), "").unwrap();
    assert_eq!(out, "BA");
    assert_eq!(cpu.program.label_data("PTR_A"), Some(15));
    assert_eq!(cpu.program.label_data("TMP"), Some(65));
}

#[test]
fn test_runaway_loop() {
    let err = run(&[("loop.ala", "START: JMP START")], RunFlags::empty(), "").unwrap_err();
    assert!(matches!(err, AlaError::JumpLimit { .. }));
}
